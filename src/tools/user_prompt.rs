//! User prompt handling and slash-command resolution

use std::path::PathBuf;

use regex::Regex;
use std::sync::LazyLock;

use crate::error::Result;

static SLASH_COMMAND_RE: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"^user:([a-zA-Z0-9_-]+)$").unwrap());

/// Process the user's verbatim prompt. Prompts starting with a slash are
/// resolved as commands against `~/.claude/commands/<name>.md`; anything
/// else is acknowledged.
pub fn user_prompt(user_text: &str) -> Result<String> {
   let trimmed = user_text.trim();
   if let Some(command) = trimmed.strip_prefix('/') {
      return Ok(resolve_slash_command(command.trim()));
   }

   Ok("User prompt received".to_string())
}

fn resolve_slash_command(command: &str) -> String {
   let Some(caps) = SLASH_COMMAND_RE.captures(command) else {
      return format!("Unknown slash command: {command}");
   };
   let name = &caps[1];

   let Some(commands_dir) = commands_dir() else {
      return format!("Unknown slash command: {name}");
   };
   let command_file = commands_dir.join(format!("{name}.md"));
   if !command_file.exists() {
      return format!("Unknown slash command: {name}");
   }

   match std::fs::read_to_string(&command_file) {
      Ok(content) => content,
      Err(e) => format!("Error reading command file: {e}"),
   }
}

fn commands_dir() -> Option<PathBuf> {
   std::env::var("HOME")
      .or_else(|_| std::env::var("USERPROFILE"))
      .ok()
      .map(|home| PathBuf::from(home).join(".claude").join("commands"))
}
