//! Built-in rule catalogue.
//!
//! Patterns are case-insensitive regular expressions searched anywhere in the
//! text. Order matters: within a tier the first matching rule supplies the
//! reason.

/// A pattern and the reason reported when it matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSpec {
    pub pattern: &'static str,
    pub reason: &'static str,
}

/// Both patterns must match the same command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkRuleSpec {
    pub network: &'static str,
    pub sensitive: &'static str,
    pub reason: &'static str,
}

const fn rule(pattern: &'static str, reason: &'static str) -> RuleSpec {
    RuleSpec { pattern, reason }
}

const fn network(
    network: &'static str,
    sensitive: &'static str,
    reason: &'static str,
) -> NetworkRuleSpec {
    NetworkRuleSpec {
        network,
        sensitive,
        reason,
    }
}

// ──── Shell: Block ────
pub const SHELL_BLOCK: &[RuleSpec] = &[
    // Recursive deletes from critical paths
    rule(r"rm\s+-[rf]*\s+/", "Recursive delete from root directory"),
    rule(r"rm\s+-[rf]*\s+~/", "Recursive delete from home directory"),
    rule(r"rm\s+-[rf]*\s+\*", "Recursive delete with wildcard"),
    // Disk and filesystem
    rule(r"dd\s+if=.*of=/dev/", "Direct disk write operation"),
    rule(r"mkfs\.", "Filesystem format operation"),
    rule(r":\s*\(\s*\)\s*\{", "Potential fork bomb detected"),
    rule(r">\s*/dev/sd[a-z]", "Direct device overwrite"),
    rule(r"chmod\s+-R\s+777\s+/", "Insecure permissions on root"),
    // Remote code execution
    rule(r"curl.*\|\s*(ba)?sh", "Piping remote content to shell"),
    rule(r"wget.*\|\s*(ba)?sh", "Piping remote content to shell"),
    rule(r#"eval\s+"\$\(curl"#, "Eval of remote content"),
    // System file overwrites
    rule(r">\s*/etc/passwd", "Overwriting passwd file"),
    rule(r">\s*/etc/shadow", "Overwriting shadow file"),
    // Force push to protected branches
    rule(r"--force\s+.*push.*main", "Force push to main branch"),
    rule(r"--force\s+.*push.*master", "Force push to master branch"),
    rule(r"push\s+.*--force.*main", "Force push to main branch"),
    rule(r"push\s+.*--force.*master", "Force push to master branch"),
    rule(
        r"git\s+clean\s+-[a-zA-Z]*f[a-zA-Z]*d|git\s+clean\s+-[a-zA-Z]*d[a-zA-Z]*f",
        "git clean -fd removes untracked files and directories",
    ),
    rule(r"truncate\s+-s\s*0", "Truncating file to zero bytes"),
    // Reverse shells
    rule(r"nc\s+.*-e\s+/bin/", "Reverse shell via netcat"),
    rule(r"bash\s+-i\s+>&\s*/dev/tcp/", "Bash reverse shell"),
    rule(r"socat\s+.*exec:", "Reverse shell via socat"),
    rule(r"python[23]?\s+-c\s+.*socket.*connect", "Python reverse shell"),
    // Kernel modules
    rule(r"\bmodprobe\s+", "Loading kernel module"),
    rule(r"\binsmod\s+", "Inserting kernel module"),
    rule(r"\brmmod\s+", "Removing kernel module"),
    // Firewall manipulation
    rule(r"\biptables\s+", "Firewall rule modification"),
    rule(r"\bnft\s+", "Nftables rule modification"),
    rule(r"\bufw\s+(allow|deny|delete|reset)", "UFW firewall modification"),
    // Decoded payloads piped to a shell
    rule(r"base64\s+-d\s*\|\s*(ba)?sh", "Base64 decoded content piped to shell"),
    rule(r"base64\s+--decode\s*\|\s*(ba)?sh", "Base64 decoded content piped to shell"),
];

// ──── Shell: Confirm ────
pub const SHELL_CONFIRM: &[RuleSpec] = &[
    // Branch named before the force flag
    rule(r"git\s+push\s+.*\bmain\b.*\s(--force|-f)\b", "Force push to main branch"),
    rule(r"git\s+push\s+.*\bmaster\b.*\s(--force|-f)\b", "Force push to master branch"),
    rule(r"sudo\s+", "Elevated privileges requested"),
    rule(r"pacman\s+-Syu", "Full system upgrade"),
    rule(r"pacman\s+-Rns", "Package removal with dependencies"),
    rule(r"systemctl\s+(stop|disable|mask)", "Stopping/disabling system service"),
    rule(r"rm\s+-[rf]", "Recursive/force delete operation"),
    rule(r"git\s+push", "Pushing to remote repository"),
    rule(r"git\s+reset\s+--hard", "Hard reset — will lose changes"),
    rule(r"git\s+checkout\s+--\s+\.", "Discarding all local changes"),
    rule(r"pip\s+install.*--system", "System-wide pip install"),
    rule(r"npm\s+install\s+-g", "Global npm install"),
    rule(r"docker\s+system\s+prune", "Docker cleanup operation"),
    rule(r"docker\s+rm", "Docker container removal"),
    rule(r"reboot|shutdown|poweroff", "System power operation"),
    // Scheduled tasks
    rule(r"\bcrontab\s+", "Crontab modification"),
    rule(r"\bat\s+", "Scheduling job with at"),
    // Process killing
    rule(r"\bkill\s+", "Killing process"),
    rule(r"\bkillall\s+", "Killing all processes by name"),
    rule(r"\bpkill\s+", "Killing processes by pattern"),
    // Debugging/tracing
    rule(r"\bstrace\s+", "System call tracing"),
    rule(r"\bltrace\s+", "Library call tracing"),
];

// ──── Shell: Warn ────
pub const SHELL_WARN: &[RuleSpec] = &[
    rule(r"chmod\s+777", "Overly permissive file permissions"),
    rule(r"chown\s+-R", "Recursive ownership change"),
    rule(r"find.*-exec.*rm", "Find with delete execution"),
    rule(r"xargs.*rm", "Piped delete operation"),
];

// ──── Files: Confirm ────
pub const FILE_CONFIRM: &[RuleSpec] = &[
    rule(r"\.env$", "Environment file modification"),
    rule(r"\.env\.", "Environment file modification"),
    rule(r"credentials", "Credentials file modification"),
    rule(r"secret", "Secrets file modification"),
    rule(r"password", "Password file modification"),
    rule(r"\.ssh/", "SSH configuration modification"),
    rule(r"/etc/", "System configuration modification"),
    rule(r"\.gnupg/", "GPG configuration modification"),
];

// ──── Files: Warn ────
pub const FILE_WARN: &[RuleSpec] = &[
    rule(r"config", "Configuration file modification"),
    rule(r"\.json$", "JSON configuration modification"),
    rule(r"\.yaml$", "YAML configuration modification"),
    rule(r"\.yml$", "YAML configuration modification"),
];

// ──── Delegated prompts (Confirm only) ────
pub const DELEGATION_CONFIRM: &[RuleSpec] = &[
    rule(r"rm\s+-rf", "Destructive delete in agent prompt"),
    rule(r"\bsudo\b", "Privilege escalation in agent prompt"),
    rule(r"curl.*\|\s*(ba)?sh", "Remote code execution in agent prompt"),
    rule(r"disable\s+guard", "Attempting to disable guardrails"),
    rule(r"bypass\s+check", "Attempting to bypass safety checks"),
    rule(r"ignore\s+safety", "Attempting to ignore safety measures"),
    rule(r"skip\s+guard", "Attempting to skip guardrails"),
    rule(r"turn\s+off\s+(guard|safe)", "Attempting to disable safety"),
];

// ──── Network tools touching sensitive material (Warn) ────
pub const NETWORK_SENSITIVE: &[NetworkRuleSpec] = &[
    network(
        r"\b(curl|wget|http)\b",
        r"\.(env|pem|key|p12|pfx|jks)",
        "Network tool accessing sensitive file",
    ),
    network(
        r"\b(curl|wget)\b.*-d\s+@",
        r"\.",
        "Uploading file contents via network",
    ),
    network(
        r"\b(curl|wget)\b.*--data.*@",
        r"\.",
        "Uploading file contents via network",
    ),
    network(
        r"\b(curl|wget)\b",
        r"(credentials|secrets?|passwords?|tokens?|\.ssh/|\.gnupg/)",
        "Network tool referencing sensitive path",
    ),
];
