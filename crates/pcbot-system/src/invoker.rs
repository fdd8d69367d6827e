//! Power actions: the OS `shutdown` utility, or a logging stand-in.

use pcbot_timer::ActionInvoker;
use pcbot_types::PendingAction;
use tracing::info;

use crate::run_command;

/// Target platform family for `shutdown` argument syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }
}

/// Arguments for an immediate `shutdown` invocation.
pub fn shutdown_args(platform: Platform, action: PendingAction) -> Vec<String> {
    let args: &[&str] = match (platform, action) {
        (Platform::Windows, PendingAction::Shutdown) => &["/s", "/t", "0"],
        (Platform::Windows, PendingAction::Restart) => &["/r", "/t", "0"],
        (Platform::Unix, PendingAction::Shutdown) => &["-h", "now"],
        (Platform::Unix, PendingAction::Restart) => &["-r", "now"],
    };
    args.iter().map(|a| a.to_string()).collect()
}

/// Runs the host's `shutdown` command.
#[derive(Debug, Clone)]
pub struct SystemActionInvoker {
    program: String,
    platform: Platform,
}

impl SystemActionInvoker {
    pub fn new() -> Self {
        Self {
            program: "shutdown".to_string(),
            platform: Platform::current(),
        }
    }

    /// Use a different executable, e.g. a wrapper script.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for SystemActionInvoker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ActionInvoker for SystemActionInvoker {
    async fn invoke(&self, action: PendingAction) -> anyhow::Result<()> {
        let args = shutdown_args(self.platform, action);
        info!(action = %action, program = %self.program, ?args, "Running power action");
        run_command(&self.program, &args).await?;
        Ok(())
    }
}

/// Logs actions without touching the host.
#[derive(Debug, Clone, Default)]
pub struct DryRunActionInvoker;

#[async_trait::async_trait]
impl ActionInvoker for DryRunActionInvoker {
    async fn invoke(&self, action: PendingAction) -> anyhow::Result<()> {
        info!(action = %action, "Dry run: skipping power action");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_args() {
        assert_eq!(
            shutdown_args(Platform::Windows, PendingAction::Shutdown),
            vec!["/s", "/t", "0"]
        );
        assert_eq!(
            shutdown_args(Platform::Windows, PendingAction::Restart),
            vec!["/r", "/t", "0"]
        );
    }

    #[test]
    fn test_unix_args() {
        assert_eq!(
            shutdown_args(Platform::Unix, PendingAction::Shutdown),
            vec!["-h", "now"]
        );
        assert_eq!(
            shutdown_args(Platform::Unix, PendingAction::Restart),
            vec!["-r", "now"]
        );
    }

    #[tokio::test]
    async fn test_dry_run_succeeds() {
        DryRunActionInvoker
            .invoke(PendingAction::Shutdown)
            .await
            .unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_program_override() {
        // `true` ignores its arguments and exits 0.
        let invoker = SystemActionInvoker::new().with_program("true");
        invoker.invoke(PendingAction::Restart).await.unwrap();

        let failing = SystemActionInvoker::new().with_program("false");
        assert!(failing.invoke(PendingAction::Restart).await.is_err());
    }
}
