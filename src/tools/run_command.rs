//! Configured command execution

use crate::{
   command::run_code_command,
   commit::append_commit_hash,
   config::ProjectConfig,
   error::{CodeMcpError, Result},
   guard,
};

/// Run a command configured in `codemcp.toml` under the commutable
/// auto-commit protocol. `arguments` is tokenized shell-style and appended
/// to the configured argv.
pub fn run_command(path: &str, command: &str, arguments: Option<&str>, chat_id: &str) -> Result<String> {
   let project_dir = guard::normalize_file_path(path)?;

   let extra_args = match arguments {
      Some(text) if !text.trim().is_empty() => shell_words::split(text)
         .map_err(|e| CodeMcpError::Other(format!("Failed to parse arguments: {e}")))?,
      _ => Vec::new(),
   };

   let config = ProjectConfig::load(&project_dir)?;
   let argv = config.command_argv(command, &extra_args).unwrap_or_default();

   let commit_message = format!("Auto-commit {command} changes");
   let result = run_code_command(&project_dir, command, &argv, &commit_message, chat_id)?;

   Ok(append_commit_hash(&result, &project_dir))
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_unconfigured_command_is_error() {
      let dir = std::env::temp_dir().join("codemcp_runcmd_test");
      std::fs::create_dir_all(&dir).unwrap();
      let err = run_command(dir.to_str().unwrap(), "format", None, "chat-1").unwrap_err();
      assert!(err.to_string().contains("No format command configured"));
      std::fs::remove_dir_all(&dir).ok();
   }
}
