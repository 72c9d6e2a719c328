//! Short labels for raw adapter error text.
//!
//! Upstream tool messages are not a stable contract, so this stays an ordered
//! substring table with a default rather than an exhaustive enum. First match
//! wins.

/// Label for text no rule recognises.
pub const UNCLASSIFIED: &str = "unclassified fatal error";

pub const PATH_BLOCKED: &str = "path blocked";
pub const PERMISSION_DENIED: &str = "permission denied";
pub const WORKSPACE_MISSING: &str = "workspace missing";
pub const PATH_CONFLICT: &str = "path conflict";
pub const TASK_PANICKED: &str = "task panicked";
pub const UNRESOLVED: &str = "unresolved after action";

/// Ordered `(substring, label)` rules.
pub static ERROR_RULES: &[(&str, &str)] = &[
    ("ambiguous argument 'HEAD'", "empty repository"),
    ("does not have any commits yet", "empty repository"),
    ("does not appear to be a git repository", "origin not set"),
    ("remote origin is not set", "origin not set"),
    ("URL mismatch", "URL mismatch"),
    ("no upstream configured", "no upstream"),
    ("HEAD does not point to a branch", "detached HEAD"),
    ("Could not resolve host", "network unreachable"),
    ("Authentication failed", "authentication failed"),
    ("Permission denied (publickey)", "authentication failed"),
    ("could not read Username", "authentication failed"),
    ("Repository not found", "remote not found"),
    ("unable to access", "remote unreachable"),
    ("already exists and is not an empty directory", "checkout path occupied"),
    ("not a git repository", "not a repository"),
    ("CONFLICT", "merge conflict"),
    ("would be overwritten", "local changes block update"),
    ("Not possible to fast-forward", "diverged from upstream"),
    ("[rejected]", "push rejected"),
    ("nothing to commit", "nothing to commit"),
    ("unable to determine upstream position", "unknown upstream position"),
    ("task panicked", TASK_PANICKED),
];

/// Map raw error text to a short label. Total: never fails, never panics.
pub fn classify_error(text: &str) -> &'static str {
    ERROR_RULES
        .iter()
        .find(|(needle, _)| text.contains(needle))
        .map(|(_, label)| *label)
        .unwrap_or(UNCLASSIFIED)
}

/// True when `text` consists only of git redirect notices pointing back at
/// `own_url`.
///
/// Such notices are recorded as warnings and never fail a repository. Any
/// other non-empty line makes the text fatal.
pub fn is_redirect_warning(text: &str, own_url: &str) -> bool {
    let own = normalize_url(own_url);
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty()).peekable();
    lines.peek().is_some()
        && lines.all(|line| {
            line.strip_prefix("warning: redirecting to ")
                .map(|target| normalize_url(target) == own)
                .unwrap_or(false)
        })
}

fn normalize_url(url: &str) -> String {
    url.trim()
        .trim_end_matches('/')
        .trim_end_matches(".git")
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(
        "fatal: ambiguous argument 'HEAD': unknown revision or path not in the working tree.",
        "empty repository"
    )]
    #[case(
        "fatal: 'origin' does not appear to be a git repository\nfatal: Could not read from remote repository.",
        "origin not set"
    )]
    #[case("URL mismatch: expected a, found b", "URL mismatch")]
    #[case("fatal: no upstream configured for branch 'main'", "no upstream")]
    #[case(
        "fatal: unable to access 'https://x/': Could not resolve host: x",
        "network unreachable"
    )]
    #[case("remote: Repository not found.\nfatal: repository 'https://x/' not found", "remote not found")]
    #[case("fatal: not a git repository (or any of the parent directories): .git", "not a repository")]
    #[case(" ! [rejected]        main -> main (fetch first)", "push rejected")]
    #[case("something nobody anticipated", UNCLASSIFIED)]
    #[case("", UNCLASSIFIED)]
    fn labels(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(classify_error(text), expected);
    }

    #[test]
    fn classification_is_deterministic() {
        let text = "fatal: no upstream configured for branch 'x'";
        assert_eq!(classify_error(text), classify_error(text));
    }

    #[test]
    fn redirect_to_own_url_is_a_warning() {
        let url = "https://github.com/alice/dotfiles.git";
        assert!(is_redirect_warning(
            "warning: redirecting to https://github.com/alice/dotfiles.git/",
            url
        ));
        assert!(is_redirect_warning(
            "warning: redirecting to https://GitHub.com/alice/dotfiles/",
            url
        ));
    }

    #[test]
    fn redirect_elsewhere_is_not_a_warning() {
        let url = "https://github.com/alice/dotfiles.git";
        assert!(!is_redirect_warning(
            "warning: redirecting to https://github.com/mallory/dotfiles.git/",
            url
        ));
        assert!(!is_redirect_warning("fatal: something else", url));
        assert!(!is_redirect_warning("", url));
    }

    #[test]
    fn redirect_followed_by_fatal_is_not_a_warning() {
        let url = "https://github.com/alice/dotfiles.git";
        let text = "warning: redirecting to https://github.com/alice/dotfiles.git/\n\
                    fatal: Authentication failed for 'https://github.com/alice/dotfiles.git/'";
        assert!(!is_redirect_warning(text, url));
        assert_eq!(classify_error(text), "authentication failed");
    }
}
