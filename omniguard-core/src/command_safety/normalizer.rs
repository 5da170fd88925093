//! Command normalization for evasion-resistant matching.
//!
//! Rewrites a raw shell command into a canonical form so that trivially
//! disguised commands still hit the rule catalogue:
//! - `$HOME`, `${HOME}` and a leading `~` are expanded
//! - split short flags are merged (`rm -r -f` → `rm -rf`)
//! - path tokens with `..` segments are resolved lexically
//! - `echo <b64> | base64 -d` payloads are decoded and appended
//!
//! Everything here is pure string processing; no process is spawned.

use std::path::Path;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use regex::{Captures, NoExpand, Regex};

use super::compile_regex;
use crate::utils::path::normalize_lexical;

/// Separator placed between a command and its decoded base64 payload.
pub const DECODED_MARKER: &str = " __DECODED__:";

static HOME_VARIABLE: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\$\{HOME\}|\$HOME\b"));

static SPLIT_SHORT_FLAGS: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"(\b\w+\s+)((?:-[a-zA-Z]+\s+)+-[a-zA-Z]+\b)"));

static SHORT_FLAG_GROUP: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"-([a-zA-Z]+)"));

static TOKEN: LazyLock<Regex> = LazyLock::new(|| compile_regex(r"\S+"));

static BASE64_PIPE: LazyLock<Regex> = LazyLock::new(|| {
    compile_regex(
        r#"echo\s+["']?([A-Za-z0-9+/=]{4,})["']?\s*\|\s*base64\s+(?:-d|--decode)"#,
    )
});

/// A raw command together with the texts the classifier should test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCommand {
    original: String,
    variants: Vec<String>,
}

impl NormalizedCommand {
    /// The fully normalized form (equal to the original when nothing changed).
    pub fn normalized(&self) -> &str {
        self.variants.last().map_or(self.original.as_str(), String::as_str)
    }

    /// Distinct candidate texts, original first.
    pub fn candidates(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(String::as_str)
    }
}

/// Produces canonical command variants.
#[derive(Debug, Clone)]
pub struct Normalizer {
    home: String,
}

impl Normalizer {
    pub fn new(home: impl AsRef<Path>) -> Self {
        Self {
            home: home.as_ref().to_string_lossy().into_owned(),
        }
    }

    pub fn normalize(&self, raw: &str) -> NormalizedCommand {
        let canonical = self.canonicalize(raw);
        let mut variants = vec![raw.to_string()];
        if canonical != raw {
            variants.push(canonical);
        }
        NormalizedCommand {
            original: raw.to_string(),
            variants,
        }
    }

    /// Apply every transformation in order: variables, flags, paths, base64.
    pub fn canonicalize(&self, raw: &str) -> String {
        let expanded = self.expand_variables(raw);
        let merged = merge_short_flags(&expanded);
        let resolved = resolve_path_traversal(&merged);
        append_decoded_base64(&resolved)
    }

    pub fn expand_variables(&self, command: &str) -> String {
        let replaced = HOME_VARIABLE.replace_all(command, NoExpand(&self.home));
        expand_leading_tilde(&replaced, &self.home)
    }
}

/// Replace a `~` that starts a token and is followed by `/`, whitespace or
/// the end of the text.
fn expand_leading_tilde(command: &str, home: &str) -> String {
    let mut output = String::with_capacity(command.len());
    let mut previous: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(current) = chars.next() {
        let starts_token = previous.is_none_or(char::is_whitespace);
        let ends_token = chars
            .peek()
            .is_none_or(|next| *next == '/' || next.is_whitespace());
        if current == '~' && starts_token && ends_token {
            output.push_str(home);
        } else {
            output.push(current);
        }
        previous = Some(current);
    }
    output
}

/// `cmd -a -b -c` → `cmd -abc`.
pub fn merge_short_flags(command: &str) -> String {
    SPLIT_SHORT_FLAGS
        .replace_all(command, |caps: &Captures<'_>| {
            let letters: String = SHORT_FLAG_GROUP
                .captures_iter(&caps[2])
                .map(|group| group[1].to_string())
                .collect();
            format!("{}-{}", &caps[1], letters)
        })
        .into_owned()
}

/// Resolve `..` segments in tokens that start with `/`, `./` or `../`.
pub fn resolve_path_traversal(command: &str) -> String {
    TOKEN
        .replace_all(command, |caps: &Captures<'_>| {
            let token = &caps[0];
            let path_like =
                token.starts_with('/') || token.starts_with("./") || token.starts_with("../");
            if path_like && token.split('/').any(|segment| segment == "..") {
                normalize_lexical(token)
            } else {
                token.to_string()
            }
        })
        .into_owned()
}

/// Append the plaintext of an `echo <payload> | base64 -d` pipeline.
///
/// Undecodable payloads and payloads that decode to control characters leave
/// the command unchanged. A command that already carries a decoded payload is
/// returned as is.
pub fn append_decoded_base64(command: &str) -> String {
    if command.contains(DECODED_MARKER) {
        return command.to_string();
    }
    let Some(payload) = BASE64_PIPE
        .captures(command)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        return command.to_string();
    };

    let Ok(bytes) = STANDARD.decode(payload) else {
        return command.to_string();
    };
    let decoded = String::from_utf8_lossy(&bytes);
    let readable = decoded
        .chars()
        .all(|c| !c.is_control() || c.is_whitespace());
    if decoded.is_empty() || !readable {
        return command.to_string();
    }
    format!("{command}{DECODED_MARKER}{decoded}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::new("/home/agent")
    }

    #[test]
    fn expands_home_variables() {
        let n = normalizer();
        assert_eq!(n.expand_variables("rm -rf $HOME/x"), "rm -rf /home/agent/x");
        assert_eq!(n.expand_variables("ls ${HOME}"), "ls /home/agent");
        assert_eq!(n.expand_variables("cd ~ && ls ~/src"), "cd /home/agent && ls /home/agent/src");
    }

    #[test]
    fn leaves_other_variables_alone() {
        let n = normalizer();
        assert_eq!(n.expand_variables("echo $HOMEDIR $USER"), "echo $HOMEDIR $USER");
        assert_eq!(n.expand_variables("ls a~/b \\~/c ~user"), "ls a~/b \\~/c ~user");
    }

    #[test]
    fn merges_split_flags() {
        assert_eq!(merge_short_flags("rm -r -f /"), "rm -rf /");
        assert_eq!(merge_short_flags("chmod -R -v 755 dir"), "chmod -Rv 755 dir");
        assert_eq!(merge_short_flags("ls -l -a -h"), "ls -lah");
    }

    #[test]
    fn leaves_non_alphabetic_flags_alone() {
        assert_eq!(merge_short_flags("rm -rf /"), "rm -rf /");
        assert_eq!(merge_short_flags("git push --force -f"), "git push --force -f");
        assert_eq!(merge_short_flags("head -n -5 file"), "head -n -5 file");
    }

    #[test]
    fn resolves_traversal_tokens() {
        assert_eq!(
            resolve_path_traversal("cat /tmp/../etc/passwd"),
            "cat /etc/passwd"
        );
        assert_eq!(resolve_path_traversal("cat ./a/../b"), "cat b");
        assert_eq!(resolve_path_traversal("cat /tmp/a..b"), "cat /tmp/a..b");
        assert_eq!(
            resolve_path_traversal("git diff HEAD..main"),
            "git diff HEAD..main"
        );
    }

    #[test]
    fn flag_and_path_steps_are_idempotent() {
        let n = normalizer();
        for raw in [
            "rm -r -f /tmp/../",
            "ls -l -a ./x/../../y",
            "cp -r -v ../a/../b /c/./d/..",
        ] {
            let once = n.canonicalize(raw);
            assert_eq!(merge_short_flags(&once), once);
            assert_eq!(resolve_path_traversal(&once), once);
        }
    }

    #[test]
    fn decodes_base64_pipelines() {
        // "rm -rf /"
        let command = "echo 'cm0gLXJmIC8=' | base64 -d | sh";
        assert_eq!(
            append_decoded_base64(command),
            format!("{command}{DECODED_MARKER}rm -rf /")
        );
        let bare = "echo cm0gLXJmIC8= | base64 --decode";
        assert!(append_decoded_base64(bare).ends_with("__DECODED__:rm -rf /"));
    }

    #[test]
    fn base64_augmentation_is_a_fixed_point() {
        let once = append_decoded_base64("echo cm0gLXJmIC8= | base64 -d");
        assert_eq!(append_decoded_base64(&once), once);
    }

    #[test]
    fn rejects_undecodable_or_binary_payloads() {
        assert_eq!(
            append_decoded_base64("echo ab=c | base64 -d"),
            "echo ab=c | base64 -d"
        );
        // bytes 0x00 0x01 0x02
        assert_eq!(
            append_decoded_base64("echo AAEC | base64 -d"),
            "echo AAEC | base64 -d"
        );
    }

    #[test]
    fn candidates_hold_original_and_canonical_forms() {
        let normalized = normalizer().normalize("rm -r -f /");
        let candidates: Vec<&str> = normalized.candidates().collect();
        assert_eq!(candidates, vec!["rm -r -f /", "rm -rf /"]);
        assert_eq!(normalized.normalized(), "rm -rf /");

        let unchanged = normalizer().normalize("git status");
        assert_eq!(unchanged.candidates().count(), 1);
        assert_eq!(unchanged.normalized(), "git status");
    }
}
