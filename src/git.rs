//! Repository queries
//!
//! Thin wrappers over git plumbing used throughout the crate. Everything
//! here is read-only; mutation lives in [`crate::commit`] and
//! [`crate::command`].

use std::path::{Path, PathBuf};

use crate::{
   error::{CodeMcpError, Result},
   shell::run_git,
};

/// Find the repository root for `path`, walking up past non-existent
/// components so queries about yet-to-be-created files still resolve.
pub fn repository_root(path: &Path) -> Result<PathBuf> {
   let mut directory = if path.is_file() {
      path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("/"))
   } else {
      path.to_path_buf()
   };

   while !directory.exists() {
      let Some(parent) = directory.parent() else {
         return Err(CodeMcpError::NotFound(format!(
            "No existing parent directory found for path: {}",
            path.display()
         )));
      };
      directory = parent.to_path_buf();
   }

   let output = run_git(&["rev-parse", "--show-toplevel"], &directory, false)?;
   if !output.success() {
      return Err(CodeMcpError::Git(format!(
         "Path '{}' is not in a Git repository",
         path.display()
      )));
   }
   Ok(PathBuf::from(output.stdout_trimmed()))
}

pub fn is_git_repository(path: &Path) -> bool {
   repository_root(path).is_ok()
}

/// True once the repository has at least one commit.
pub fn has_commits(repo_root: &Path) -> Result<bool> {
   let output = run_git(&["rev-parse", "--verify", "HEAD"], repo_root, false)?;
   Ok(output.success())
}

/// Hash of `HEAD`, short by default.
pub fn head_commit_hash(repo_root: &Path, short: bool) -> Result<String> {
   let output = if short {
      run_git(&["rev-parse", "--short", "HEAD"], repo_root, true)?
   } else {
      run_git(&["rev-parse", "HEAD"], repo_root, true)?
   };
   Ok(output.stdout_trimmed())
}

/// Full commit message of `HEAD`.
pub fn head_commit_message(repo_root: &Path) -> Result<String> {
   let output = run_git(&["log", "-1", "--pretty=%B"], repo_root, true)?;
   Ok(output.stdout_trimmed())
}

/// Commit message stored at an arbitrary ref.
pub fn ref_commit_message(repo_root: &Path, ref_name: &str) -> Result<String> {
   let output = run_git(&["log", "-1", "--pretty=%B", ref_name], repo_root, true)?;
   Ok(output.stdout_trimmed())
}

/// Resolve any revision to a full hash.
pub fn rev_parse(repo_root: &Path, rev: &str) -> Result<String> {
   let output = run_git(&["rev-parse", rev], repo_root, true)?;
   Ok(output.stdout_trimmed())
}

/// Hash of the tree object at `rev` (e.g. `HEAD`, a commit hash).
pub fn tree_hash(repo_root: &Path, rev: &str) -> Result<String> {
   let spec = format!("{rev}^{{tree}}");
   let output = run_git(&["rev-parse", &spec], repo_root, true)?;
   Ok(output.stdout_trimmed())
}

/// Write the current index as a tree object and return its hash.
pub fn write_tree(repo_root: &Path) -> Result<String> {
   let output = run_git(&["write-tree"], repo_root, true)?;
   Ok(output.stdout_trimmed())
}

/// Check whether `file_path` is tracked in the index.
pub fn is_tracked(file_path: &Path) -> Result<bool> {
   let directory = file_path
      .parent()
      .ok_or_else(|| CodeMcpError::PathInvalid(file_path.display().to_string()))?;
   let path_str = file_path
      .to_str()
      .ok_or_else(|| CodeMcpError::PathInvalid(file_path.display().to_string()))?;
   let output = run_git(&["ls-files", "--error-unmatch", path_str], directory, false)?;
   Ok(output.success())
}

/// True when `git status --porcelain` reports anything.
pub fn has_uncommitted_changes(repo_root: &Path) -> Result<bool> {
   let output = run_git(&["status", "--porcelain"], repo_root, true)?;
   Ok(!output.stdout_trimmed().is_empty())
}

/// True when the index differs from `HEAD` (i.e. something is staged).
pub fn has_staged_changes(repo_root: &Path) -> Result<bool> {
   let output = run_git(&["diff-index", "--cached", "--quiet", "HEAD"], repo_root, false)?;
   Ok(!output.success())
}
