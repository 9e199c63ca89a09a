//! Publishing values back to the invoking CI environment.
//!
//! GitHub Actions reads step outputs from the file named by `$GITHUB_OUTPUT`,
//! one `key=value` per line.

use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

/// Publish a single output value. Outside a CI environment (no
/// `$GITHUB_OUTPUT`) the value is only logged.
pub fn publish(key: &str, value: &str) -> std::io::Result<()> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) => {
            append_output(Path::new(&path), key, value)?;
            info!(key, value, "published action output");
            Ok(())
        }
        None => {
            debug!(key, value, "GITHUB_OUTPUT not set, skipping output publication");
            Ok(())
        }
    }
}

/// Append `key=value` to an output file.
pub fn append_output(path: &Path, key: &str, value: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{key}={value}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_key_value_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("github_output");
        append_output(&path, "public_url", "frp.example.com:10022").unwrap();
        append_output(&path, "other", "value").unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "public_url=frp.example.com:10022\nother=value\n");
    }
}
