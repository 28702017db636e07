//! File removal via `git rm`

use crate::{
   commit::{append_commit_hash, commit_changes},
   error::{CodeMcpError, Result},
   git, guard,
   shell::run_git,
};

/// Remove a tracked file with `git rm` and commit the removal.
pub fn rm_file(path: &str, description: &str, chat_id: &str) -> Result<String> {
   let full_path = guard::normalize_file_path(path)?;
   guard::check_edit_permission(&full_path)?;

   if !full_path.exists() {
      return Err(CodeMcpError::NotFound(format!("File does not exist: {path}")));
   }
   if !full_path.is_file() {
      return Err(CodeMcpError::IsADirectory(path.to_string()));
   }

   let repo_root = git::repository_root(&full_path)?;
   guard::check_containment(&full_path, &repo_root)?;

   if !git::is_tracked(&full_path)? {
      return Err(CodeMcpError::NotTracked);
   }

   let rel_path = full_path
      .strip_prefix(&repo_root)
      .map(|p| p.display().to_string())
      .unwrap_or_else(|_| full_path.display().to_string());

   run_git(&["rm", &rel_path], &repo_root, true)?;

   let file_name = full_path
      .file_name()
      .and_then(|n| n.to_str())
      .unwrap_or(&rel_path)
      .to_string();

   // git rm already staged the removal, no commit_all needed.
   let outcome = commit_changes(
      &repo_root,
      &format!("Remove {file_name}: {description}"),
      chat_id,
      false,
      false,
   );

   let result = match outcome {
      Ok(_) => format!("Successfully removed file {file_name}."),
      Err(e) => format!("File {file_name} was removed but failed to commit: {e}"),
   };
   Ok(append_commit_hash(&result, &repo_root))
}
