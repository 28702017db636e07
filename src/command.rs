//! Commutable auto-commit command runner
//!
//! Project-configured commands (format, lint, test, ...) run against a
//! working tree that may hold uncommitted user edits. The protocol here
//! keeps those edits separate from whatever the command rewrites:
//!
//! 1. Snapshot pending changes into a `PRE_COMMIT`, then reset `HEAD` back
//!    (mixed) so the tree still holds them.
//! 2. Run the command.
//! 3. If it changed nothing, drop the snapshot and return.
//! 4. Otherwise record the command's effect as a `POST_COMMIT` on top of
//!    the snapshot, then try to commute the pair: cherry-pick the command's
//!    commit onto the original head, the snapshot on top of that, and
//!    compare trees. When the trees agree, the command's changes become the
//!    new commit and the user's edits return to the working tree; when they
//!    do not, the original causal order is kept.
//!
//! Any failure restores the tree exactly as the user left it.

use std::{
   path::{Path, PathBuf},
   process::Command,
};

use crate::{
   error::{CodeMcpError, Result},
   git,
   output::truncate_output,
   shell::run_git,
};

/// Reachable states of a command-run transaction. Recovery is a total
/// function of this state.
#[derive(Debug, Clone)]
enum TxState {
   /// Nothing recorded yet; nothing to restore.
   NotStarted,
   /// Pending changes snapshotted and unstaged again.
   Snapshotted { original_head: String, pre_commit: String },
}

/// Restores the working tree on drop unless the transaction completed.
struct RestoreGuard {
   repo_root: PathBuf,
   state:     TxState,
   disarmed:  bool,
}

impl RestoreGuard {
   fn new(repo_root: PathBuf) -> Self {
      Self { repo_root, state: TxState::NotStarted, disarmed: false }
   }

   fn snapshotted(&mut self, original_head: String, pre_commit: String) {
      self.state = TxState::Snapshotted { original_head, pre_commit };
   }

   fn disarm(&mut self) {
      self.disarmed = true;
   }

   fn restore(&self) {
      if let TxState::Snapshotted { original_head, pre_commit } = &self.state {
         // Abort any cherry-pick in flight, materialise the snapshot tree,
         // then move HEAD back while leaving the user's edits unstaged.
         let _ = run_git(&["cherry-pick", "--abort"], &self.repo_root, false);
         let restored = run_git(&["reset", "--hard", pre_commit], &self.repo_root, false)
            .map(|out| out.success())
            .unwrap_or(false)
            && run_git(&["reset", original_head], &self.repo_root, false)
               .map(|out| out.success())
               .unwrap_or(false);
         if restored {
            tracing::info!("Restored original state after command failure");
         } else {
            tracing::error!("Failed to restore original state");
         }
      }
   }
}

impl Drop for RestoreGuard {
   fn drop(&mut self) {
      if !self.disarmed {
         self.restore();
      }
   }
}

/// Run one configured command under the commutable auto-commit protocol.
pub fn run_code_command(
   project_dir: &Path,
   command_name: &str,
   argv: &[String],
   commit_message: &str,
   chat_id: &str,
) -> Result<String> {
   if !project_dir.exists() {
      return Err(CodeMcpError::NotFound(format!(
         "Directory does not exist: {}",
         project_dir.display()
      )));
   }
   if !project_dir.is_dir() {
      return Err(CodeMcpError::NotADirectory(project_dir.display().to_string()));
   }
   if argv.is_empty() {
      return Err(CodeMcpError::Config(format!(
         "No {command_name} command configured in codemcp.toml"
      )));
   }

   let is_git_repo = git::is_git_repository(project_dir);
   let repo_root =
      if is_git_repo { git::repository_root(project_dir)? } else { project_dir.to_path_buf() };

   let mut guard = RestoreGuard::new(repo_root.clone());

   // Snapshot pending changes so the command starts from a clean baseline
   // while the tree keeps the user's edits.
   if is_git_repo && git::has_commits(&repo_root)? {
      let original_head = git::rev_parse(&repo_root, "HEAD")?;

      if git::has_uncommitted_changes(&repo_root)? {
         tracing::info!("Creating PRE_COMMIT before running {command_name}");
         run_git(&["add", "."], &repo_root, true)?;
         let snapshot_message = format!("PRE_COMMIT: Snapshot before auto-{command_name}");
         run_git(&["commit", "--no-gpg-sign", "-m", &snapshot_message], &repo_root, true)?;
         let pre_commit = git::rev_parse(&repo_root, "HEAD")?;

         run_git(&["reset", &original_head], &repo_root, true)?;
         tracing::info!("Created PRE_COMMIT {pre_commit}, reset HEAD to {original_head}");

         guard.snapshotted(original_head, pre_commit);
      }
   }

   let run = execute(argv, project_dir)?;
   let truncated_stdout = truncate_output(&run.stdout);

   if run.status != 0 {
      tracing::error!("{command_name} command failed with exit code {}", run.status);
      // Guard restores the pre-run tree on drop.
      return Err(CodeMcpError::CommandFailed {
         name:   title_case(command_name),
         code:   run.status,
         stdout: format!("STDOUT:\n{truncated_stdout}"),
         stderr: format!("STDERR:\n{}", truncate_output(&run.stderr)),
      });
   }

   let result = match guard.state.clone() {
      TxState::Snapshotted { original_head, pre_commit } => commute(
         &repo_root,
         command_name,
         commit_message,
         &original_head,
         &pre_commit,
         &truncated_stdout,
      )?,
      TxState::NotStarted => {
         if is_git_repo && git::has_uncommitted_changes(&repo_root)? {
            tracing::info!("Changes detected after {command_name}, committing");
            match crate::commit::commit_changes(&repo_root, commit_message, chat_id, false, true) {
               Ok(_) => {
                  format!("Code {command_name} successful and changes committed:\n{truncated_stdout}")
               },
               Err(e) => format!(
                  "Code {command_name} successful but failed to commit changes:\n{truncated_stdout}\nCommit error: {e}"
               ),
            }
         } else {
            format!("Code {command_name} successful:\n{truncated_stdout}")
         }
      },
   };

   guard.disarm();
   Ok(result)
}

/// Attempt to commute the user's snapshot with the command's effect.
fn commute(
   repo_root: &Path,
   command_name: &str,
   commit_message: &str,
   original_head: &str,
   pre_commit: &str,
   truncated_stdout: &str,
) -> Result<String> {
   // The user's snapshotted edits are still in the tree, so a bare status
   // check cannot see whether the command did anything; compare the staged
   // tree against the snapshot's tree instead.
   run_git(&["add", "."], repo_root, true)?;
   let staged_tree = git::write_tree(repo_root)?;
   if staged_tree == git::tree_hash(repo_root, pre_commit)? {
      tracing::info!("No changes made by {command_name}, ignoring PRE_COMMIT");
      run_git(&["reset", original_head], repo_root, true)?;
      return Ok(format!("Code {command_name} successful (no changes made):\n{truncated_stdout}"));
   }

   tracing::info!("Changes detected after {command_name}, creating POST_COMMIT");

   // Record the command's effect on top of the snapshot.
   run_git(&["update-ref", "HEAD", pre_commit], repo_root, true)?;
   let post_message = format!("POST_COMMIT: {commit_message}");
   run_git(&["commit", "--no-gpg-sign", "-m", &post_message], repo_root, true)?;
   let post_commit = git::rev_parse(repo_root, "HEAD")?;
   tracing::info!("Created POST_COMMIT: {post_commit}");

   // Replay in the opposite order onto the original head: the command's
   // effect first (the pick that can actually conflict), then the user's
   // snapshot on top.
   run_git(&["reset", "--hard", original_head], repo_root, true)?;

   let pick_command = run_git(&["cherry-pick", "--no-gpg-sign", &post_commit], repo_root, false)?;
   if !pick_command.success() {
      return fall_back_to_original_order(repo_root, command_name, &post_commit, truncated_stdout);
   }
   let commuted_command = git::rev_parse(repo_root, "HEAD")?;

   let pick_user = run_git(&["cherry-pick", "--no-gpg-sign", pre_commit], repo_root, false)?;
   if !pick_user.success() {
      return fall_back_to_original_order(repo_root, command_name, &post_commit, truncated_stdout);
   }
   let commuted_full = git::rev_parse(repo_root, "HEAD")?;

   let original_tree = git::tree_hash(repo_root, &post_commit)?;
   let commuted_tree = git::tree_hash(repo_root, &commuted_full)?;

   if original_tree == commuted_tree {
      // The orders agree: keep the command's effect committed and hand the
      // user's edits back as working-tree modifications.
      run_git(&["reset", &commuted_command], repo_root, true)?;
      tracing::info!("Commutation successful, reset to command-only commit");
      Ok(format!(
         "Code {command_name} successful (changes commuted successfully):\n{truncated_stdout}"
      ))
   } else {
      tracing::info!("Commutation resulted in different trees, using original POST_COMMIT");
      run_git(&["reset", "--hard", &post_commit], repo_root, true)?;
      Ok(format!(
         "Code {command_name} successful (changes don't commute, using original order):\n{truncated_stdout}"
      ))
   }
}

/// Cherry-pick failed somewhere: keep the recorded causal order instead.
fn fall_back_to_original_order(
   repo_root: &Path,
   command_name: &str,
   post_commit: &str,
   truncated_stdout: &str,
) -> Result<String> {
   tracing::info!("Cherry-pick failed, using original POST_COMMIT");
   let _ = run_git(&["cherry-pick", "--abort"], repo_root, false);
   run_git(&["reset", "--hard", post_commit], repo_root, true)?;
   Ok(format!(
      "Code {command_name} successful (changes don't commute, using original order):\n{truncated_stdout}"
   ))
}

struct RunOutput {
   status: i32,
   stdout: Vec<u8>,
   stderr: Vec<u8>,
}

fn execute(argv: &[String], cwd: &Path) -> Result<RunOutput> {
   let (program, args) = argv
      .split_first()
      .ok_or_else(|| CodeMcpError::Other("Empty command".to_string()))?;

   tracing::info!("Running command: {}", argv.join(" "));

   let output = Command::new(program)
      .args(args)
      .current_dir(cwd)
      .output()
      .map_err(|e| CodeMcpError::Other(format!("Failed to run {program}: {e}")))?;

   Ok(RunOutput {
      status: output.status.code().unwrap_or(-1),
      stdout: output.stdout,
      stderr: output.stderr,
   })
}

fn title_case(name: &str) -> String {
   let mut chars = name.chars();
   match chars.next() {
      Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
      None => String::new(),
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_title_case() {
      assert_eq!(title_case("format"), "Format");
      assert_eq!(title_case(""), "");
   }

   #[test]
   fn test_missing_command_is_config_error() {
      let dir = std::env::temp_dir();
      let err = run_code_command(&dir, "lint", &[], "msg", "chat").unwrap_err();
      assert!(err.to_string().contains("No lint command configured"));
   }
}
