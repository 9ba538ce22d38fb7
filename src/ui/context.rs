//! Detects whether output goes to a person or to a CI log

use std::io::IsTerminal;

/// Environment variables set by common CI providers
const CI_VARS: &[&str] = &[
    "CI",
    "BITRISE_IO",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// UI context that determines output behavior
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        let on_terminal = std::io::stdout().is_terminal() && std::io::stderr().is_terminal();
        let in_ci = CI_VARS.iter().any(|var| std::env::var_os(var).is_some());
        Self {
            interactive: on_terminal && !in_ci,
        }
    }

    /// Plain line-oriented output (tests, CI logs)
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Check if we should use spinners and progress bars
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
