//! Narrow log-tail collaborator.
//!
//! The tunnel client is an independent OS process whose only status channel
//! back to the controller is its log file. The keep-alive tick polls that
//! file through the [`StatusSource`] trait so tests (or a future structured
//! health check) can swap the implementation.

use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Source of status lines for the keep-alive tick.
pub trait StatusSource {
    /// Return lines produced since the previous poll. Best effort: only one
    /// writer exists, so read-what's-there with no locking is acceptable.
    fn poll(&mut self) -> std::io::Result<Vec<String>>;
}

/// Tails a log file by byte offset, returning newly appended complete lines.
#[derive(Debug)]
pub struct LogFileTail {
    path: PathBuf,
    offset: u64,
}

impl LogFileTail {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StatusSource for LogFileTail {
    fn poll(&mut self) -> std::io::Result<Vec<String>> {
        let mut file = match std::fs::File::open(&self.path) {
            Ok(file) => file,
            // The background process may not have created the file yet.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;

        // Consume only complete lines; a partial trailing line is re-read on
        // the next poll.
        let consumed = buf.rfind('\n').map_or(0, |i| i + 1);
        self.offset += consumed as u64;
        Ok(buf[..consumed].lines().map(str::to_string).collect())
    }
}
