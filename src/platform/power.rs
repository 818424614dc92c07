//! Best-effort display/suspend inhibition.
//!
//! Run once at startup. A session-level inhibit is inherently environment
//! specific, so the hook is a shell command: the configured
//! `power.inhibit-command`, or `xset s off -dpms` on Linux when nothing is
//! configured. Failures are logged and ignored; there is no retry and no
//! effect on sequencing.

use std::process::Command;

use tracing::{info, warn};

pub fn inhibit_suspend(custom_command: Option<&str>) {
    let command = match custom_command {
        Some(cmd) if !cmd.trim().is_empty() => cmd,
        Some(_) | None => {
            if cfg!(target_os = "linux") {
                "xset s off -dpms"
            } else {
                info!("no power inhibit command for this platform; skipping");
                return;
            }
        }
    };

    match run_command(command) {
        Ok(()) => info!(command, "display blanking inhibited"),
        Err(err) => warn!(command, "power inhibit failed (continuing): {err}"),
    }
}

fn run_command(command: &str) -> Result<(), String> {
    let status = Command::new("sh")
        .arg("-c")
        .arg(command)
        .status()
        .map_err(|err| format!("failed to spawn shell: {err}"))?;

    if status.success() {
        Ok(())
    } else {
        Err(format!(
            "command exited with status {}",
            status.code().unwrap_or(-1)
        ))
    }
}
