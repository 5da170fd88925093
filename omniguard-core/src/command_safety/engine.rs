//! Tiered rule matching over normalized commands, file paths and delegated
//! prompts.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::normalizer::Normalizer;
use super::rules::{self, NetworkRuleSpec, RuleSpec};
use super::{Decision, NETWORK_SENSITIVE_RULE, Tier, compile_case_insensitive};
use crate::tool::ToolInvocation;

/// A rule with its compiled, case-insensitive regex.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub pattern: &'static str,
    pub reason: &'static str,
    pub tier: Tier,
    regex: Regex,
}

impl CompiledRule {
    fn new(spec: &RuleSpec, tier: Tier) -> Self {
        Self {
            pattern: spec.pattern,
            reason: spec.reason,
            tier,
            regex: compile_case_insensitive(spec.pattern),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    fn decision(&self) -> Decision {
        Decision::matched(self.tier, self.reason, self.pattern)
    }
}

/// Network tool and sensitive reference that must both appear.
#[derive(Debug, Clone)]
pub struct NetworkRule {
    pub reason: &'static str,
    network: Regex,
    sensitive: Regex,
}

impl NetworkRule {
    fn new(spec: &NetworkRuleSpec) -> Self {
        Self {
            reason: spec.reason,
            network: compile_case_insensitive(spec.network),
            sensitive: compile_case_insensitive(spec.sensitive),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.network.is_match(text) && self.sensitive.is_match(text)
    }
}

/// The compiled rule sets, each in evaluation order.
#[derive(Debug)]
pub struct RuleCatalogue {
    /// Block, then Confirm, then Warn.
    shell: Vec<CompiledRule>,
    /// Confirm, then Warn.
    file: Vec<CompiledRule>,
    delegation: Vec<CompiledRule>,
    network: Vec<NetworkRule>,
}

static BUILTIN: LazyLock<RuleCatalogue> = LazyLock::new(RuleCatalogue::compile_builtin);

impl RuleCatalogue {
    /// The built-in catalogue, compiled once per process.
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    fn compile_builtin() -> Self {
        Self {
            shell: tiered(&[
                (rules::SHELL_BLOCK, Tier::Block),
                (rules::SHELL_CONFIRM, Tier::Confirm),
                (rules::SHELL_WARN, Tier::Warn),
            ]),
            file: tiered(&[
                (rules::FILE_CONFIRM, Tier::Confirm),
                (rules::FILE_WARN, Tier::Warn),
            ]),
            delegation: tiered(&[(rules::DELEGATION_CONFIRM, Tier::Confirm)]),
            network: rules::NETWORK_SENSITIVE.iter().map(NetworkRule::new).collect(),
        }
    }

    pub fn shell_rules(&self) -> &[CompiledRule] {
        &self.shell
    }

    pub fn file_rules(&self) -> &[CompiledRule] {
        &self.file
    }

    pub fn delegation_rules(&self) -> &[CompiledRule] {
        &self.delegation
    }

    pub fn network_rules(&self) -> &[NetworkRule] {
        &self.network
    }
}

fn tiered(sets: &[(&[RuleSpec], Tier)]) -> Vec<CompiledRule> {
    sets.iter()
        .flat_map(|(specs, tier)| specs.iter().map(|spec| CompiledRule::new(spec, *tier)))
        .collect()
}

/// Classifies tool invocations into decision tiers.
#[derive(Debug, Clone)]
pub struct PatternEngine {
    normalizer: Normalizer,
    catalogue: &'static RuleCatalogue,
}

impl PatternEngine {
    pub fn new(normalizer: Normalizer) -> Self {
        Self {
            normalizer,
            catalogue: RuleCatalogue::builtin(),
        }
    }

    pub fn evaluate(&self, invocation: &ToolInvocation) -> Decision {
        let decision = match invocation {
            ToolInvocation::ShellCommand(shell) => self.evaluate_shell(&shell.command),
            ToolInvocation::FileWrite(_)
            | ToolInvocation::FileEdit(_)
            | ToolInvocation::MultiFileEdit(_)
            | ToolInvocation::NotebookEdit(_) => {
                self.evaluate_file(invocation.target_path().unwrap_or_default())
            }
            ToolInvocation::AgentDelegation(task) => self.evaluate_delegation(&task.prompt),
        };
        debug!(
            tool = %invocation.kind(),
            tier = %decision.tier,
            rule = decision.matched_rule.as_deref().unwrap_or(""),
            "classified tool invocation"
        );
        decision
    }

    /// Rules are tried in tier order against every canonical variant; the
    /// network combinator only sees the raw text.
    pub fn evaluate_shell(&self, command: &str) -> Decision {
        let normalized = self.normalizer.normalize(command);
        let hit = self
            .catalogue
            .shell_rules()
            .iter()
            .find(|rule| normalized.candidates().any(|candidate| rule.is_match(candidate)));
        if let Some(rule) = hit {
            return rule.decision();
        }

        self.catalogue
            .network_rules()
            .iter()
            .find(|rule| rule.is_match(command))
            .map_or_else(Decision::allow, |rule| {
                Decision::matched(Tier::Warn, rule.reason, NETWORK_SENSITIVE_RULE)
            })
    }

    /// The raw target path, without normalization.
    pub fn evaluate_file(&self, path: &str) -> Decision {
        first_match(self.catalogue.file_rules(), path)
    }

    pub fn evaluate_delegation(&self, prompt: &str) -> Decision {
        first_match(self.catalogue.delegation_rules(), prompt)
    }
}

fn first_match(rules: &[CompiledRule], text: &str) -> Decision {
    rules
        .iter()
        .find(|rule| rule.is_match(text))
        .map_or_else(Decision::allow, CompiledRule::decision)
}
