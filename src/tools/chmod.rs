//! Executable-bit changes
//!
//! Only `a+x` and `a-x` are supported because the executable bit is the
//! only permission git tracks.

use std::os::unix::fs::PermissionsExt;

use serde::Deserialize;

use crate::{
   commit::{append_commit_hash, commit_changes},
   error::{CodeMcpError, Result},
   guard,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ChmodMode {
   #[serde(rename = "a+x")]
   AddExecutable,
   #[serde(rename = "a-x")]
   RemoveExecutable,
}

/// Toggle the executable bit on a file and commit the change.
pub fn chmod(path: &str, mode: ChmodMode, chat_id: &str) -> Result<String> {
   let full_path = guard::normalize_file_path(path)?;
   guard::check_edit_permission(&full_path)?;

   if !full_path.exists() {
      return Err(CodeMcpError::NotFound(format!("The file does not exist: {path}")));
   }

   let metadata = std::fs::metadata(&full_path)?;
   let current = metadata.permissions().mode();
   let is_executable = current & 0o100 != 0;

   match mode {
      ChmodMode::AddExecutable if is_executable => {
         return Ok(format!("File '{path}' is already executable"));
      },
      ChmodMode::RemoveExecutable if !is_executable => {
         return Ok(format!("File '{path}' is already non-executable"));
      },
      _ => {},
   }

   let new_mode = match mode {
      ChmodMode::AddExecutable => current | 0o111,
      ChmodMode::RemoveExecutable => current & !0o111,
   };
   std::fs::set_permissions(&full_path, std::fs::Permissions::from_mode(new_mode))?;

   let file_name = full_path
      .file_name()
      .and_then(|n| n.to_str())
      .unwrap_or(path)
      .to_string();

   let (description, action_msg) = match mode {
      ChmodMode::AddExecutable => {
         (format!("Make '{file_name}' executable"), format!("Made file '{path}' executable"))
      },
      ChmodMode::RemoveExecutable => (
         format!("Remove executable permission from '{file_name}'"),
         format!("Removed executable permission from file '{path}'"),
      ),
   };

   commit_changes(&full_path, &description, chat_id, false, false)?;

   let result = format!("{action_msg} and committed changes");
   Ok(append_commit_hash(&result, &full_path))
}
