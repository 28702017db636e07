//! Shared in-process state
//!
//! The only cross-call state the backend keeps is the map from file path to
//! the time it was last read. An edit against a file whose on-disk mtime is
//! newer than the recorded read must fail until the caller re-reads it.

use std::{collections::HashMap, path::{Path, PathBuf}, time::SystemTime};

use parking_lot::Mutex;

use crate::error::{CodeMcpError, Result};

/// Tracks when each file was last read by the session.
#[derive(Debug, Default)]
pub struct ReadTimestamps {
   inner: Mutex<HashMap<PathBuf, SystemTime>>,
}

impl ReadTimestamps {
   pub fn new() -> Self {
      Self::default()
   }

   /// Record that `path` was read (or rewritten) just now, using its
   /// current on-disk mtime.
   pub fn record(&self, path: &Path) {
      if let Ok(metadata) = std::fs::metadata(path)
         && let Ok(mtime) = metadata.modified()
      {
         self.inner.lock().insert(path.to_path_buf(), mtime);
      }
   }

   pub fn has_read(&self, path: &Path) -> bool {
      self.inner.lock().contains_key(path)
   }

   /// Fail when the file changed on disk after the recorded read.
   pub fn check_fresh(&self, path: &Path) -> Result<()> {
      let recorded = self.inner.lock().get(path).copied();
      let Some(recorded) = recorded else {
         return Err(CodeMcpError::Other(
            "File has not been read yet. Read it first before writing to it.".to_string(),
         ));
      };

      let mtime = std::fs::metadata(path).and_then(|m| m.modified())?;
      if mtime > recorded {
         return Err(CodeMcpError::StaleRead);
      }
      Ok(())
   }
}
