//! Tool surface
//!
//! One file per operation, plus the tagged input enum that validates every
//! inbound call at the boundary. Each operation returns a single string;
//! errors are flattened to a leading `Error: ` by [`Tools::dispatch`].

pub mod chmod;
pub mod edit_file;
pub mod git_query;
pub mod grep;
pub mod init_project;
pub mod ls;
pub mod mv;
pub mod read_file;
pub mod rm;
pub mod run_command;
pub mod user_prompt;
pub mod write_file;

use serde::Deserialize;

use crate::{error::Result, session, state::ReadTimestamps};

/// A validated tool invocation. The `subtool` tag selects the operation and
/// the permitted-parameter matrix is enforced in [`ToolCall::from_value`].
#[derive(Debug, Deserialize)]
#[serde(tag = "subtool")]
pub enum ToolCall {
   InitProject {
      path:          String,
      user_prompt:   String,
      subject_line:  String,
      #[serde(default)]
      reuse_head_chat_id: bool,
   },
   ReadFile {
      path:   String,
      offset: Option<usize>,
      limit:  Option<usize>,
   },
   WriteFile {
      path:        String,
      content:     String,
      description: String,
      chat_id:     String,
   },
   EditFile {
      path:        String,
      old_string:  String,
      new_string:  String,
      description: String,
      chat_id:     String,
   },
   #[serde(rename = "LS")]
   Ls { path: String, chat_id: String },
   Grep {
      pattern: String,
      path:    String,
      include: Option<String>,
      chat_id: String,
   },
   #[serde(rename = "RM")]
   Rm {
      path:        String,
      description: String,
      chat_id:     String,
   },
   #[serde(rename = "MV")]
   Mv {
      source_path: String,
      target_path: String,
      description: String,
      chat_id:     String,
   },
   Chmod {
      path:    String,
      mode:    chmod::ChmodMode,
      chat_id: String,
   },
   RunCommand {
      path:      String,
      command:   String,
      arguments: Option<String>,
      chat_id:   String,
   },
   UserPrompt { user_text: String, chat_id: String },
   GitLog {
      arguments: Option<String>,
      path:      String,
      chat_id:   String,
   },
   GitDiff {
      arguments: Option<String>,
      path:      String,
      chat_id:   String,
   },
   GitShow {
      arguments: Option<String>,
      path:      String,
      chat_id:   String,
   },
   GitBlame {
      arguments: Option<String>,
      path:      String,
      chat_id:   String,
   },
}

impl ToolCall {
   /// Parse a call from JSON, rejecting unknown operations and unexpected
   /// parameters before any field-level deserialization.
   pub fn from_value(value: serde_json::Value) -> std::result::Result<Self, String> {
      let Some(object) = value.as_object() else {
         return Err("Tool call must be a JSON object".to_string());
      };
      let Some(subtool) = object.get("subtool").and_then(|v| v.as_str()) else {
         return Err("Missing subtool".to_string());
      };
      let subtool = subtool.to_string();
      let subtool = subtool.as_str();

      let expected: &[&str] = match subtool {
         "InitProject" => &["path", "user_prompt", "subject_line", "reuse_head_chat_id"],
         "ReadFile" => &["path", "offset", "limit"],
         "WriteFile" => &["path", "content", "description", "chat_id"],
         "EditFile" => &["path", "old_string", "new_string", "description", "chat_id"],
         "LS" => &["path", "chat_id"],
         "Grep" => &["pattern", "path", "include", "chat_id"],
         "RM" => &["path", "description", "chat_id"],
         "MV" => &["source_path", "target_path", "description", "chat_id"],
         "Chmod" => &["path", "mode", "chat_id"],
         "RunCommand" => &["path", "command", "arguments", "chat_id"],
         "UserPrompt" => &["user_text", "chat_id"],
         "GitLog" | "GitDiff" | "GitShow" | "GitBlame" => &["arguments", "path", "chat_id"],
         other => return Err(format!("Unknown subtool: {other}")),
      };

      let unexpected: Vec<&str> = object
         .keys()
         .map(String::as_str)
         .filter(|key| *key != "subtool" && !expected.contains(key))
         .collect();
      if !unexpected.is_empty() {
         return Err(format!(
            "Unexpected parameters for {subtool} command: {}",
            unexpected.join(", ")
         ));
      }

      serde_json::from_value(value).map_err(|e| format!("Invalid {subtool} call: {e}"))
   }

   /// The chat ID carried by this call, when the operation takes one.
   fn chat_id(&self) -> Option<&str> {
      match self {
         Self::InitProject { .. } | Self::ReadFile { .. } => None,
         Self::WriteFile { chat_id, .. }
         | Self::EditFile { chat_id, .. }
         | Self::Ls { chat_id, .. }
         | Self::Grep { chat_id, .. }
         | Self::Rm { chat_id, .. }
         | Self::Mv { chat_id, .. }
         | Self::Chmod { chat_id, .. }
         | Self::RunCommand { chat_id, .. }
         | Self::UserPrompt { chat_id, .. }
         | Self::GitLog { chat_id, .. }
         | Self::GitDiff { chat_id, .. }
         | Self::GitShow { chat_id, .. }
         | Self::GitBlame { chat_id, .. } => Some(chat_id),
      }
   }
}

/// The backend's entry point: dispatches validated calls, serialising all
/// mutations against one working copy behind the caller's ordering.
#[derive(Debug, Default)]
pub struct Tools {
   read_state: ReadTimestamps,
}

impl Tools {
   pub fn new() -> Self {
      Self::default()
   }

   /// Run one tool call, flattening failures into `Error: ` strings.
   pub fn dispatch(&self, call: ToolCall) -> String {
      match self.try_dispatch(call) {
         Ok(result) => result,
         Err(e) => format!("Error: {e}"),
      }
   }

   fn try_dispatch(&self, call: ToolCall) -> Result<String> {
      if let Some(chat_id) = call.chat_id() {
         session::validate_chat_id(chat_id)?;
      }

      match call {
         ToolCall::InitProject { path, user_prompt, subject_line, reuse_head_chat_id } => {
            init_project::init_project(&path, &user_prompt, &subject_line, reuse_head_chat_id)
         },
         ToolCall::ReadFile { path, offset, limit } => {
            read_file::read_file(&path, offset, limit, &self.read_state)
         },
         ToolCall::WriteFile { path, content, description, chat_id } => {
            write_file::write_file(&path, &content, &description, &chat_id, &self.read_state)
         },
         ToolCall::EditFile { path, old_string, new_string, description, chat_id } => {
            edit_file::edit_file(
               &path,
               &old_string,
               &new_string,
               &description,
               &chat_id,
               &self.read_state,
            )
         },
         ToolCall::Ls { path, .. } => ls::ls_directory(&path),
         ToolCall::Grep { pattern, path, include, .. } => {
            grep::grep_files(&pattern, &path, include.as_deref())
         },
         ToolCall::Rm { path, description, chat_id } => rm::rm_file(&path, &description, &chat_id),
         ToolCall::Mv { source_path, target_path, description, chat_id } => {
            mv::mv_file(&source_path, &target_path, &description, &chat_id)
         },
         ToolCall::Chmod { path, mode, chat_id } => chmod::chmod(&path, mode, &chat_id),
         ToolCall::RunCommand { path, command, arguments, chat_id } => {
            run_command::run_command(&path, &command, arguments.as_deref(), &chat_id)
         },
         ToolCall::UserPrompt { user_text, .. } => user_prompt::user_prompt(&user_text),
         ToolCall::GitLog { arguments, path, .. } => {
            git_query::git_query("log", arguments.as_deref(), &path)
         },
         ToolCall::GitDiff { arguments, path, .. } => {
            git_query::git_query("diff", arguments.as_deref(), &path)
         },
         ToolCall::GitShow { arguments, path, .. } => {
            git_query::git_query("show", arguments.as_deref(), &path)
         },
         ToolCall::GitBlame { arguments, path, .. } => {
            git_query::git_query("blame", arguments.as_deref(), &path)
         },
      }
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   fn parse(json: &str) -> std::result::Result<ToolCall, String> {
      ToolCall::from_value(serde_json::from_str(json).unwrap())
   }

   #[test]
   fn test_unknown_subtool_rejected() {
      let err = parse(r#"{"subtool": "Nuke", "path": "/x"}"#).unwrap_err();
      assert!(err.contains("Unknown subtool: Nuke"));
   }

   #[test]
   fn test_unexpected_parameter_rejected() {
      let err =
         parse(r#"{"subtool": "LS", "path": "/x", "chat_id": "c-1", "content": "nope"}"#)
            .unwrap_err();
      assert!(err.contains("Unexpected parameters for LS command: content"));
   }

   #[test]
   fn test_missing_required_parameter_rejected() {
      let err = parse(r#"{"subtool": "WriteFile", "path": "/x", "chat_id": "c-1"}"#).unwrap_err();
      assert!(err.contains("Invalid WriteFile call"));
   }

   #[test]
   fn test_invalid_chat_id_flattened_to_error() {
      let tools = Tools::new();
      let call = parse(r#"{"subtool": "LS", "path": "/x", "chat_id": "bad id"}"#).unwrap();
      let result = tools.dispatch(call);
      assert!(result.starts_with("Error: "));
      assert!(result.contains("Invalid chat ID format"));
   }
}
