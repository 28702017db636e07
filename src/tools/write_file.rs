//! Whole-file writes

use crate::{
   commit::{append_commit_hash, commit_changes},
   error::Result,
   guard,
   line_endings::{detect_line_endings, detect_repo_line_endings, write_text_file},
   state::ReadTimestamps,
};

/// Overwrite a tracked file or create a new one, and commit the result.
pub fn write_file(
   path: &str,
   content: &str,
   description: &str,
   chat_id: &str,
   read_state: &ReadTimestamps,
) -> Result<String> {
   let (full_path, _repo_root) = guard::check_mutable_path(path, chat_id)?;

   let line_ending = if full_path.exists() {
      detect_line_endings(&full_path)
   } else {
      let parent = full_path.parent().unwrap_or(&full_path);
      detect_repo_line_endings(parent)
   };

   write_text_file(&full_path, content, line_ending)?;
   read_state.record(&full_path);

   let git_message = match commit_changes(&full_path, description, chat_id, false, false) {
      Ok(message) if message.contains("previous commit was") => format!("\n{message}"),
      Ok(_) => format!("\nChanges committed to git: {description}"),
      Err(e) => format!("\nFailed to commit changes to git: {e}"),
   };

   let result = format!("Successfully wrote to {}{git_message}", full_path.display());
   Ok(append_commit_hash(&result, &full_path))
}
