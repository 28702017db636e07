//! File moves via `git mv`

use crate::{
   commit::{append_commit_hash, commit_changes},
   error::{CodeMcpError, Result},
   git, guard,
   shell::run_git,
};

/// Move a tracked file with `git mv` and commit the move. Both the source
/// and the target's parent directory must live inside the repository, and
/// the target directory must already exist.
pub fn mv_file(source_path: &str, target_path: &str, description: &str, chat_id: &str) -> Result<String> {
   let source = guard::normalize_file_path(source_path)?;
   let target = guard::normalize_file_path(target_path)?;
   guard::check_edit_permission(&source)?;
   guard::check_edit_permission(&target)?;

   if !source.exists() {
      return Err(CodeMcpError::NotFound(format!("Source file does not exist: {source_path}")));
   }
   if !source.is_file() {
      return Err(CodeMcpError::IsADirectory(source_path.to_string()));
   }

   let repo_root = git::repository_root(&source)?;
   guard::check_containment(&source, &repo_root)?;

   let target_dir = target.parent().unwrap_or(&repo_root);
   if !target_dir.exists() {
      return Err(CodeMcpError::NotFound(format!(
         "Target directory does not exist: {}",
         target_dir.display()
      )));
   }
   guard::check_containment(&target, &repo_root)?;

   if !git::is_tracked(&source)? {
      return Err(CodeMcpError::NotTracked);
   }

   let rel = |p: &std::path::Path| {
      p.strip_prefix(&repo_root)
         .map(|r| r.display().to_string())
         .unwrap_or_else(|_| p.display().to_string())
   };
   let source_rel = rel(&source);
   let target_rel = rel(&target);

   tracing::info!("Moving file: {source_rel} -> {target_rel}");
   run_git(&["mv", &source_rel, &target_rel], &repo_root, true)?;

   // git mv already staged the rename.
   let outcome = commit_changes(
      &repo_root,
      &format!("Move {source_rel} -> {target_rel}: {description}"),
      chat_id,
      false,
      false,
   );

   let result = match outcome {
      Ok(_) => format!("Successfully moved file from {source_rel} to {target_rel}."),
      Err(e) => {
         format!("File was moved from {source_rel} to {target_rel} but failed to commit: {e}")
      },
   };
   Ok(append_commit_hash(&result, &repo_root))
}
