//! Commit engine
//!
//! Stages changes, composes structured commit messages, and creates or
//! amends commits. Session references are created through plumbing
//! (`commit-tree` + `update-ref`) so `HEAD` never moves before the first
//! real mutation; everything else goes through porcelain `git commit`.

use std::{
   path::Path,
   process::{Command, Stdio},
};

use crate::{
   error::{CodeMcpError, Result},
   git,
   message::{CHAT_ID_TRAILER, set_chat_id, update_message_with_revision},
   session,
   shell::run_git,
};

/// Base-revision placeholder used when a commit has no parent.
const NO_PARENT_HASH: &str = "0000000";

/// Stage and commit changes for a path, amending when `HEAD` already
/// belongs to this chat session.
///
/// Returns a human-readable notice: committed, amended (with the previous
/// hash), or a benign "no changes" message.
pub fn commit_changes(
   path: &Path,
   description: &str,
   chat_id: &str,
   allow_empty: bool,
   commit_all: bool,
) -> Result<String> {
   let repo_root = git::repository_root(path)?;

   // Stage. `git rm` / `git mv` flows arrive already staged, so an add that
   // stages nothing new is fine.
   if commit_all {
      if !git::has_uncommitted_changes(&repo_root)? {
         return Ok("No changes to commit".to_string());
      }
      run_git(&["add", "."], &repo_root, true)?;
   } else if path.is_dir() {
      run_git(&["add", "."], &repo_root, true)?;
   } else {
      let path_str = path
         .to_str()
         .ok_or_else(|| CodeMcpError::PathInvalid(path.display().to_string()))?;
      let add = run_git(&["add", path_str], &repo_root, false)?;
      if !add.success() {
         return Err(CodeMcpError::Git(format!("Failed to add to Git: {}", add.stderr_str())));
      }
   }

   let has_commits = git::has_commits(&repo_root)?;

   if has_commits && !git::has_staged_changes(&repo_root)? && !allow_empty {
      return Ok(
         "No changes to commit (changes already committed or no changes detected)".to_string(),
      );
   }

   let mut head_chat_id = if has_commits { session::head_chat_id(&repo_root)? } else { None };
   tracing::debug!("commit_changes: has_commits={has_commits}, head_chat_id={head_chat_id:?}");

   // HEAD belongs to another session (or none): promote the prepared
   // session ref first, so this edit amends into the session's own commit.
   if has_commits
      && head_chat_id.as_deref() != Some(chat_id)
      && session::ref_exists(&repo_root, chat_id)?
   {
      session::promote_ref(&repo_root, chat_id)?;
      head_chat_id = session::head_chat_id(&repo_root)?;
   }

   let should_amend = has_commits && head_chat_id.as_deref() == Some(chat_id);

   if should_amend {
      let previous_hash = git::head_commit_hash(&repo_root, true)?;
      let current_message = git::head_commit_message(&repo_root)?;

      if !current_message.contains(&format!("{CHAT_ID_TRAILER}: ")) {
         tracing::warn!("Expected {CHAT_ID_TRAILER} in current commit but not found");
      }

      let commit_message =
         update_message_with_revision(&current_message, description, &previous_hash, chat_id);

      let output = run_git(
         &["commit", "--amend", "--no-gpg-sign", "-m", &commit_message],
         &repo_root,
         false,
      )?;
      if !output.success() {
         return Err(CodeMcpError::Git(format!(
            "Failed to commit changes: {}",
            output.stderr_str()
         )));
      }

      Ok(format!("Changes amended successfully (previous commit was {previous_hash})"))
   } else {
      let parent_hash = if has_commits {
         git::head_commit_hash(&repo_root, true)?
      } else {
         NO_PARENT_HASH.to_string()
      };

      let base_message = format!("wip: {description}");
      let commit_message =
         update_message_with_revision(&base_message, description, &parent_hash, chat_id);

      let mut args = vec!["commit", "--no-gpg-sign", "-m", commit_message.as_str()];
      if allow_empty {
         args.push("--allow-empty");
      }
      let output = run_git(&args, &repo_root, false)?;
      if !output.success() {
         return Err(CodeMcpError::Git(format!(
            "Failed to commit changes: {}",
            output.stderr_str()
         )));
      }

      Ok("Changes committed successfully".to_string())
   }
}

/// Create the session's prepared commit and store it at
/// `refs/codemcp/<chat_id>` without advancing `HEAD`.
///
/// The commit's tree matches `HEAD` (or the empty tree in a fresh
/// repository) and its message carries the subject line, the user prompt,
/// and the `codemcp-id` trailer.
pub fn create_commit_reference(
   path: &Path,
   subject_line: &str,
   user_prompt: &str,
   chat_id: &str,
) -> Result<String> {
   let repo_root = git::repository_root(path)?;
   let ref_name = session::session_ref_name(chat_id);

   let has_commits = git::has_commits(&repo_root)?;
   let tree = if has_commits {
      git::tree_hash(&repo_root, "HEAD")?
   } else {
      empty_tree_hash(&repo_root)?
   };

   let body = if user_prompt.is_empty() {
      subject_line.to_string()
   } else {
      format!("{subject_line}\n\n{user_prompt}")
   };
   let commit_message = set_chat_id(&body, chat_id);

   let commit_hash = if has_commits {
      let head_hash = git::head_commit_hash(&repo_root, false)?;
      run_git(
         &["commit-tree", &tree, "-p", &head_hash, "-m", &commit_message],
         &repo_root,
         true,
      )?
      .stdout_trimmed()
   } else {
      run_git(&["commit-tree", &tree, "-m", &commit_message], &repo_root, true)?.stdout_trimmed()
   };

   run_git(&["update-ref", &ref_name, &commit_hash], &repo_root, true)?;
   tracing::debug!("Created commit reference {ref_name} -> {commit_hash}");

   Ok(commit_hash)
}

/// Hash of the canonical empty tree, for session refs in repositories with
/// no commits yet.
fn empty_tree_hash(repo_root: &Path) -> Result<String> {
   let mut child = Command::new("git")
      .args(["mktree"])
      .current_dir(repo_root)
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .spawn()
      .map_err(|e| CodeMcpError::Git(format!("Failed to spawn git mktree: {e}")))?;

   if let Some(stdin) = child.stdin.take() {
      drop(stdin);
   }

   let output = child
      .wait_with_output()
      .map_err(|e| CodeMcpError::Git(format!("Failed to wait for git mktree: {e}")))?;

   if !output.status.success() {
      return Err(CodeMcpError::Git(format!(
         "git mktree failed: {}",
         String::from_utf8_lossy(&output.stderr)
      )));
   }

   Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Append `Current commit hash: <short>` to a tool result when the
/// repository has a resolvable `HEAD`.
pub fn append_commit_hash(result: &str, path: &Path) -> String {
   match git::repository_root(path).and_then(|root| git::head_commit_hash(&root, true)) {
      Ok(hash) => format!("{result}\n\nCurrent commit hash: {hash}"),
      Err(_) => result.to_string(),
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   // Commit behavior against real repositories is covered by the
   // integration tests; here we only pin the message used for writes that
   // have no staged effect.
   #[test]
   fn test_no_parent_placeholder_is_hash_width() {
      assert_eq!(NO_PARENT_HASH.len(), 7);
   }

   #[test]
   fn test_append_commit_hash_outside_repo() {
      let dir = std::env::temp_dir().join("codemcp_no_repo_here");
      std::fs::create_dir_all(&dir).unwrap();
      let result = append_commit_hash("Done.", &dir);
      // Outside a repository the result passes through unchanged.
      if !git::is_git_repository(&dir) {
         assert_eq!(result, "Done.");
      }
      std::fs::remove_dir_all(&dir).ok();
   }
}
