//! Content search backed by `git grep`

use std::time::SystemTime;

use crate::{
   error::{CodeMcpError, Result},
   git, guard,
   shell::run_git,
};

const MAX_RESULTS: usize = 100;

/// Search for a pattern with `git grep -li`, returning matching file paths
/// sorted by modification time (newest first), capped at 100 files.
pub fn grep_files(pattern: &str, path: &str, include: Option<&str>) -> Result<String> {
   let full_path = guard::normalize_file_path(path)?;

   if !git::is_git_repository(&full_path) {
      return Err(CodeMcpError::Git(format!(
         "The provided path is not in a git repository: {path}"
      )));
   }
   if !full_path.exists() {
      return Err(CodeMcpError::NotFound(format!("Path does not exist: {path}")));
   }

   // Searching a single file restricts the pathspec to that file.
   let (search_dir, pathspec) = if full_path.is_file() {
      let dir = full_path
         .parent()
         .ok_or_else(|| CodeMcpError::PathInvalid(path.to_string()))?
         .to_path_buf();
      let name = full_path
         .file_name()
         .and_then(|n| n.to_str())
         .ok_or_else(|| CodeMcpError::PathInvalid(path.to_string()))?
         .to_string();
      (dir, Some(name))
   } else {
      (full_path.clone(), include.map(ToString::to_string))
   };

   let mut args: Vec<&str> = vec!["grep", "-li", pattern];
   if let Some(spec) = pathspec.as_deref() {
      args.push("--");
      args.push(spec);
   }

   let output = run_git(&args, &search_dir, false)?;
   // Exit code 1 just means no matches.
   if output.status > 1 {
      return Err(CodeMcpError::Git(format!("git grep failed: {}", output.stderr_str())));
   }

   let mut matches: Vec<String> = output
      .stdout_str()
      .lines()
      .filter(|line| !line.trim().is_empty())
      .map(|line| search_dir.join(line.trim()).display().to_string())
      .collect();

   let num_files = matches.len();

   // Newest first, file name as tiebreaker.
   matches.sort_by_key(|m| {
      let mtime = std::fs::metadata(m)
         .and_then(|meta| meta.modified())
         .unwrap_or(SystemTime::UNIX_EPOCH);
      (std::cmp::Reverse(mtime), m.clone())
   });

   if num_files == 0 {
      return Ok("No files found".to_string());
   }

   let plural = if num_files == 1 { "" } else { "s" };
   let mut result = format!(
      "Found {num_files} file{plural}\n{}",
      matches.iter().take(MAX_RESULTS).cloned().collect::<Vec<_>>().join("\n")
   );
   if num_files > MAX_RESULTS {
      result.push_str("\n(Results are truncated. Consider using a more specific path or pattern.)");
   }

   Ok(result)
}
