//! Windows service registration through `sc.exe`.

use std::path::Path;

use tracing::{info, warn};

use crate::{SystemError, run_command};

/// Name the service is registered under.
pub const SERVICE_NAME: &str = "PcBotControl";

const SERVICE_DESCRIPTION: &str =
    "Telegram bot for PC control - remote shutdown and restart through Telegram";

/// `sc create` arguments for an auto-start LocalSystem service.
pub fn create_args(exe_path: &Path) -> Vec<String> {
    vec![
        "create".into(),
        SERVICE_NAME.into(),
        "binPath=".into(),
        format!("\"{}\"", exe_path.display()),
        "start=".into(),
        "auto".into(),
        "obj=".into(),
        "LocalSystem".into(),
    ]
}

fn ensure_windows(operation: &'static str) -> Result<(), SystemError> {
    if cfg!(windows) {
        Ok(())
    } else {
        Err(SystemError::Unsupported(operation))
    }
}

/// Register the current executable as an auto-start service.
pub async fn register_service() -> Result<(), SystemError> {
    ensure_windows("service registration")?;

    let exe = std::env::current_exe()?;
    let exe = std::path::absolute(&exe)?;

    run_command("sc", &create_args(&exe)).await?;
    run_command(
        "sc",
        &[
            "description".into(),
            SERVICE_NAME.into(),
            SERVICE_DESCRIPTION.into(),
        ],
    )
    .await?;

    info!(service = SERVICE_NAME, exe = %exe.display(), "Service registered");
    Ok(())
}

/// Stop and delete the service.
pub async fn unregister_service() -> Result<(), SystemError> {
    ensure_windows("service unregistration")?;

    // A stopped service makes `sc stop` fail; deletion still proceeds.
    if let Err(e) = run_command("sc", &["stop".into(), SERVICE_NAME.into()]).await {
        warn!(service = SERVICE_NAME, "Failed to stop service: {e}");
    }
    run_command("sc", &["delete".into(), SERVICE_NAME.into()]).await?;

    info!(service = SERVICE_NAME, "Service unregistered");
    Ok(())
}
