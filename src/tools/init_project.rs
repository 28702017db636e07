//! Project initialisation
//!
//! Loads `codemcp.toml`, assigns the session its chat ID, and prepares the
//! session reference so the intended commit message exists before any file
//! changes.

use crate::{
   commit::create_commit_reference,
   config::ProjectConfig,
   error::{CodeMcpError, Result},
   git, guard, session,
};

const SYSTEM_PROMPT: &str = "\
Do NOT attempt to run tests, let the user run them.
Only make changes the user asked for; use the EditFile tool for small edits
and WriteFile for full rewrites. Every change is committed automatically.";

/// Initialise a project: returns the system prompt and the chat ID the
/// caller must pass to every subsequent mutating call.
pub fn init_project(
   path: &str,
   user_prompt: &str,
   subject_line: &str,
   reuse_head_chat_id: bool,
) -> Result<String> {
   let directory = guard::normalize_file_path(path)?;

   if !directory.exists() {
      return Err(CodeMcpError::NotFound(format!("Directory does not exist: {path}")));
   }
   if !directory.is_dir() {
      return Err(CodeMcpError::NotADirectory(path.to_string()));
   }

   if !git::is_git_repository(&directory) {
      return Err(CodeMcpError::Git(format!("Path '{path}' is not in a Git repository")));
   }

   let config = ProjectConfig::load(&directory)?;

   let reused = if reuse_head_chat_id { session::head_chat_id(&directory)? } else { None };

   let chat_id = match reused {
      Some(id) => id,
      None => {
         let id = session::generate_chat_id(subject_line);
         create_commit_reference(&directory, subject_line, user_prompt, &id)?;
         id
      },
   };

   let mut prompt = SYSTEM_PROMPT.to_string();
   if let Some(project_prompt) = &config.project_prompt {
      prompt.push_str("\n\n");
      prompt.push_str(project_prompt);
   }

   if !config.commands.is_empty() {
      let mut names: Vec<String> = Vec::new();
      for (name, entry) in &config.commands {
         match entry.doc() {
            Some(doc) => names.push(format!("- {name}: {doc}")),
            None => names.push(format!("- {name}")),
         }
      }
      prompt.push_str("\n\nConfigured commands (run with the RunCommand tool):\n");
      prompt.push_str(&names.join("\n"));
   }

   prompt.push_str(&format!("\n\nThis chat has been assigned a unique ID: {chat_id}"));

   Ok(prompt)
}
