//! Read-only git passthrough (log, diff, show, blame)

use crate::{
   error::{CodeMcpError, Result},
   git, guard,
   output::truncate_output,
   shell::run_git,
};

/// Run a read-only git subcommand with shell-style tokenized arguments and
/// return its truncated output.
pub fn git_query(subcommand: &str, arguments: Option<&str>, path: &str) -> Result<String> {
   let full_path = guard::normalize_file_path(path)?;

   if !git::is_git_repository(&full_path) {
      return Err(CodeMcpError::Git(format!(
         "The provided path is not in a git repository: {path}"
      )));
   }

   let parsed_args = match arguments {
      Some(text) if !text.trim().is_empty() => shell_words::split(text)
         .map_err(|e| CodeMcpError::Other(format!("Failed to parse arguments: {e}")))?,
      _ => Vec::new(),
   };

   let mut args: Vec<&str> = vec![subcommand];
   args.extend(parsed_args.iter().map(String::as_str));

   let cwd = if full_path.is_dir() {
      full_path.clone()
   } else {
      full_path.parent().map(std::path::Path::to_path_buf).unwrap_or(full_path.clone())
   };

   let output = run_git(&args, &cwd, false)?;
   if !output.success() {
      return Err(CodeMcpError::Git(format!(
         "git {subcommand} failed: {}",
         output.stderr_str().trim_end()
      )));
   }

   Ok(truncate_output(&output.stdout))
}
