//! Helpers for invoking external collaborator commands.

use std::process::Command;

use anyhow::{Context, Result, bail};

/// Execute a command to completion, failing with its stderr on a non-zero
/// exit. The description is what surfaces in logs and error messages.
pub fn run_cmd(description: &str, program: &str, args: &[&str]) -> Result<()> {
    tracing::info!("{description}");
    tracing::debug!(program, ?args, "exec");

    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to execute {program}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{description} failed (exit {}): {}",
            output.status,
            stderr.trim()
        );
    }
    Ok(())
}

/// Check whether a program exists on PATH.
pub fn command_exists(program: &str) -> bool {
    std::env::var_os("PATH").is_some_and(|path| {
        std::env::split_paths(&path).any(|dir| dir.join(program).is_file())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_command_is_ok() {
        run_cmd("checking true", "true", &[]).unwrap();
    }

    #[test]
    fn failing_command_reports_description() {
        let err = run_cmd("checking false", "false", &[]).unwrap_err();
        assert!(err.to_string().contains("checking false"));
    }

    #[test]
    fn missing_program_is_an_error() {
        assert!(run_cmd("nope", "definitely-not-a-real-binary", &[]).is_err());
    }

    #[test]
    fn command_exists_finds_sh() {
        assert!(command_exists("sh"));
        assert!(!command_exists("definitely-not-a-real-binary"));
    }
}
