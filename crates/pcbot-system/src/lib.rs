//! pcbot-system: host-level side effects.
//!
//! - [`invoker`]: power actions behind the `ActionInvoker` trait
//! - [`service`]: Windows service (un)registration

pub mod invoker;
pub mod service;

pub use invoker::{DryRunActionInvoker, SystemActionInvoker};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{program} exited with {code}: {output}")]
    CommandFailed {
        program: String,
        code: i32,
        output: String,
    },
    #[error("{0} is only supported on Windows")]
    Unsupported(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run a program to completion, failing on a non-zero exit status.
///
/// Returns combined stdout/stderr.
pub(crate) async fn run_command(program: &str, args: &[String]) -> Result<String, SystemError> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|source| SystemError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let mut text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.trim().is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr.trim());
    }

    if !output.status.success() {
        return Err(SystemError::CommandFailed {
            program: program.to_string(),
            code: output.status.code().unwrap_or(-1),
            output: text,
        });
    }
    Ok(text)
}
