//! Logged subprocess execution
//!
//! All git and auxiliary commands run through [`run_command`] so every
//! invocation and its outcome lands in the log at a consistent level.

use std::{path::Path, process::Command};

use crate::error::{CodeMcpError, Result};

/// Outcome of a subprocess run.
#[derive(Debug)]
pub struct CommandOutput {
   pub status: i32,
   pub stdout: Vec<u8>,
   pub stderr: Vec<u8>,
}

impl CommandOutput {
   pub fn success(&self) -> bool {
      self.status == 0
   }

   pub fn stdout_str(&self) -> String {
      String::from_utf8_lossy(&self.stdout).to_string()
   }

   pub fn stderr_str(&self) -> String {
      String::from_utf8_lossy(&self.stderr).to_string()
   }

   /// Trimmed stdout, the common shape for git plumbing answers.
   pub fn stdout_trimmed(&self) -> String {
      self.stdout_str().trim().to_string()
   }
}

/// Run a command in `cwd`, capturing output. With `check`, a non-zero exit
/// becomes an error carrying the captured stderr.
pub fn run_command(argv: &[&str], cwd: &Path, check: bool) -> Result<CommandOutput> {
   let (program, args) = argv
      .split_first()
      .ok_or_else(|| CodeMcpError::Other("Empty command".to_string()))?;

   tracing::debug!("Running command: {}", argv.join(" "));

   let output = Command::new(program)
      .args(args)
      .current_dir(cwd)
      .output()
      .map_err(|e| CodeMcpError::Other(format!("Failed to run {program}: {e}")))?;

   let result = CommandOutput {
      status: output.status.code().unwrap_or(-1),
      stdout: output.stdout,
      stderr: output.stderr,
   };

   if !result.stderr.is_empty() {
      tracing::debug!("Command stderr: {}", result.stderr_str().trim_end());
   }
   tracing::debug!("Command exit code: {}", result.status);

   if check && !result.success() {
      return Err(CodeMcpError::Other(format!(
         "Command `{}` failed with exit code {}: {}",
         argv.join(" "),
         result.status,
         result.stderr_str().trim_end()
      )));
   }

   Ok(result)
}

/// Run `git` with the given arguments. Errors carry the git stderr.
pub fn run_git(args: &[&str], cwd: &Path, check: bool) -> Result<CommandOutput> {
   let mut argv = vec!["git"];
   argv.extend_from_slice(args);

   let result = run_command(&argv, cwd, false)?;
   if check && !result.success() {
      return Err(CodeMcpError::Git(format!(
         "git {} failed: {}",
         args.first().copied().unwrap_or(""),
         result.stderr_str().trim_end()
      )));
   }
   Ok(result)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_run_command_captures_stdout() {
      let out = run_command(&["echo", "hello"], Path::new("."), true).unwrap();
      assert_eq!(out.stdout_trimmed(), "hello");
   }

   #[test]
   fn test_check_failure_is_error() {
      let err = run_command(&["false"], Path::new("."), true);
      assert!(err.is_err());
   }

   #[test]
   fn test_no_check_failure_is_ok() {
      let out = run_command(&["false"], Path::new("."), false).unwrap();
      assert!(!out.success());
   }
}
