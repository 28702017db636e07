//! Guard layer
//!
//! Every mutating operation funnels through the checks here, in order:
//! path normalisation, permission (a `codemcp.toml` ancestor must exist and
//! the config file itself is never editable), repository containment after
//! symlink resolution, and git tracking for files that already exist.

use std::path::{Component, Path, PathBuf};

use crate::{
   commit::commit_changes,
   error::{CodeMcpError, Result},
   git,
};

/// Normalize an input path: expand `~`, resolve against the current
/// directory, and clean `.` / `..` components lexically.
pub fn normalize_file_path(path: &str) -> Result<PathBuf> {
   if path.is_empty() {
      return Err(CodeMcpError::PathInvalid(path.to_string()));
   }

   let expanded = if let Some(rest) = path.strip_prefix("~/") {
      let home = std::env::var("HOME")
         .or_else(|_| std::env::var("USERPROFILE"))
         .map_err(|_| CodeMcpError::PathInvalid(path.to_string()))?;
      PathBuf::from(home).join(rest)
   } else if path == "~" {
      let home = std::env::var("HOME")
         .or_else(|_| std::env::var("USERPROFILE"))
         .map_err(|_| CodeMcpError::PathInvalid(path.to_string()))?;
      PathBuf::from(home)
   } else {
      PathBuf::from(path)
   };

   let absolute = if expanded.is_absolute() {
      expanded
   } else {
      std::env::current_dir()?.join(expanded)
   };

   let mut clean = PathBuf::new();
   for component in absolute.components() {
      match component {
         Component::CurDir => {},
         Component::ParentDir => {
            clean.pop();
         },
         other => clean.push(other),
      }
   }

   if !clean.is_absolute() {
      return Err(CodeMcpError::PathInvalid(path.to_string()));
   }
   Ok(clean)
}

/// Resolve symlinks for comparison, tolerating paths that do not exist yet
/// by canonicalising the deepest existing ancestor.
fn resolve_for_comparison(path: &Path) -> PathBuf {
   if let Ok(real) = path.canonicalize() {
      return collapse_private_prefix(&real);
   }

   let mut existing = path.to_path_buf();
   let mut tail: Vec<std::ffi::OsString> = Vec::new();
   while !existing.exists() {
      if let Some(name) = existing.file_name() {
         tail.push(name.to_os_string());
      }
      if !existing.pop() {
         return collapse_private_prefix(path);
      }
   }

   let mut resolved = existing.canonicalize().unwrap_or(existing);
   for name in tail.iter().rev() {
      resolved.push(name);
   }
   collapse_private_prefix(&resolved)
}

/// Collapse the macOS `/private/tmp` and `/private/var` prefixes so both
/// spellings compare equal.
fn collapse_private_prefix(path: &Path) -> PathBuf {
   let Some(s) = path.to_str() else {
      return path.to_path_buf();
   };
   if let Some(rest) = s.strip_prefix("/private/tmp") {
      return PathBuf::from(format!("/tmp{rest}"));
   }
   if let Some(rest) = s.strip_prefix("/private/var") {
      return PathBuf::from(format!("/var{rest}"));
   }
   path.to_path_buf()
}

/// Permission check: the file must live under a directory carrying a
/// `codemcp.toml`, and the config file itself is never editable.
pub fn check_edit_permission(file_path: &Path) -> Result<()> {
   if file_path.file_name().is_some_and(|name| name == "codemcp.toml") {
      return Err(CodeMcpError::PermissionDenied(
         "Editing codemcp.toml is not allowed for security reasons.".to_string(),
      ));
   }

   let mut dir = file_path.parent();
   while let Some(current) = dir {
      if current.join("codemcp.toml").exists() {
         return Ok(());
      }
      dir = current.parent();
   }

   Err(CodeMcpError::PermissionDenied(format!(
      "No codemcp.toml was found in any parent directory of {}. Create one to enable editing.",
      file_path.display()
   )))
}

/// Containment check: after symlink resolution, the target must be a
/// descendant of the repository root.
pub fn check_containment(file_path: &Path, repo_root: &Path) -> Result<()> {
   let resolved_file = resolve_for_comparison(file_path);
   let resolved_root = resolve_for_comparison(repo_root);

   if resolved_file.starts_with(&resolved_root) {
      Ok(())
   } else {
      Err(CodeMcpError::OutsideRepository {
         path:      file_path.display().to_string(),
         repo_root: repo_root.display().to_string(),
      })
   }
}

/// Tracking check for files that already exist on disk, folding any other
/// pending repository changes into the session commit first so the edit
/// operates on a clean baseline.
pub fn check_git_tracking_for_existing_file(file_path: &Path, chat_id: &str) -> Result<()> {
   if !file_path.exists() {
      return Ok(());
   }

   if !git::is_tracked(file_path)? {
      return Err(CodeMcpError::NotTracked);
   }

   match commit_changes(file_path, "Snapshot before codemcp change", chat_id, false, false) {
      Ok(message) => tracing::debug!("Pending changes status: {message}"),
      Err(e) => tracing::debug!("Failed to commit pending changes: {e}"),
   }

   Ok(())
}

/// Run the full guard ladder for a mutating operation on `path`.
/// Returns the normalized path and the repository root.
pub fn check_mutable_path(path: &str, chat_id: &str) -> Result<(PathBuf, PathBuf)> {
   let full_path = normalize_file_path(path)?;
   check_edit_permission(&full_path)?;
   let repo_root = git::repository_root(&full_path)?;
   check_containment(&full_path, &repo_root)?;
   check_git_tracking_for_existing_file(&full_path, chat_id)?;
   Ok((full_path, repo_root))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_normalize_rejects_empty() {
      assert!(normalize_file_path("").is_err());
   }

   #[test]
   fn test_normalize_cleans_dot_components() {
      let p = normalize_file_path("/a/b/./c/../d").unwrap();
      assert_eq!(p, PathBuf::from("/a/b/d"));
   }

   #[test]
   fn test_normalize_relative_becomes_absolute() {
      let p = normalize_file_path("some/file.txt").unwrap();
      assert!(p.is_absolute());
      assert!(p.ends_with("some/file.txt"));
   }

   #[test]
   fn test_collapse_private_tmp() {
      assert_eq!(
         collapse_private_prefix(Path::new("/private/tmp/x/y")),
         PathBuf::from("/tmp/x/y")
      );
      assert_eq!(collapse_private_prefix(Path::new("/usr/local")), PathBuf::from("/usr/local"));
   }

   #[test]
   fn test_codemcp_toml_never_editable() {
      let err = check_edit_permission(Path::new("/repo/codemcp.toml")).unwrap_err();
      assert!(err.to_string().contains("not allowed"));
   }

   #[test]
   fn test_containment_rejects_outside() {
      let err = check_containment(Path::new("/elsewhere/file"), Path::new("/repo")).unwrap_err();
      assert!(matches!(err, CodeMcpError::OutsideRepository { .. }));
   }

   #[test]
   fn test_containment_accepts_inside() {
      // Use paths that do not exist so lexical resolution applies on every
      // platform.
      assert!(
         check_containment(
            Path::new("/nonexistent_root_x/sub/file.txt"),
            Path::new("/nonexistent_root_x")
         )
         .is_ok()
      );
   }
}
