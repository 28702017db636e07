use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::{CodeMcpError, Result};

/// Project configuration loaded from `codemcp.toml` at the repository root.
///
/// Unknown keys are ignored so projects can carry configuration for other
/// tooling in the same file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
   /// Appended to the system prompt returned by `InitProject`
   pub project_prompt: Option<String>,

   /// Named auxiliary commands (format, lint, test, ...), in file order
   pub commands: IndexMap<String, CommandEntry>,

   pub files: FilesConfig,
}

/// A configured command: either a bare argv list or a table carrying the
/// argv plus optional documentation.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CommandEntry {
   Argv(Vec<String>),
   Detailed {
      command: Vec<String>,
      #[serde(default)]
      doc:     Option<String>,
   },
}

impl CommandEntry {
   pub fn argv(&self) -> &[String] {
      match self {
         Self::Argv(argv) => argv,
         Self::Detailed { command, .. } => command,
      }
   }

   pub fn doc(&self) -> Option<&str> {
      match self {
         Self::Argv(_) => None,
         Self::Detailed { doc, .. } => doc.as_deref(),
      }
   }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
   /// "LF" or "CRLF"
   pub line_endings: Option<String>,
}

impl ProjectConfig {
   /// Load config from a specific `codemcp.toml` file.
   pub fn from_file(path: &Path) -> Result<Self> {
      let contents = std::fs::read_to_string(path)
         .map_err(|e| CodeMcpError::Config(format!("Failed to read {}: {e}", path.display())))?;
      toml::from_str(&contents)
         .map_err(|e| CodeMcpError::Config(format!("Failed to parse {}: {e}", path.display())))
   }

   /// Load config from the `codemcp.toml` in `project_dir`, or defaults if
   /// the file does not exist.
   pub fn load(project_dir: &Path) -> Result<Self> {
      let config_path = project_dir.join("codemcp.toml");
      if config_path.exists() {
         Self::from_file(&config_path)
      } else {
         Ok(Self::default())
      }
   }

   /// Look up the argv for a named command, with any user-supplied extra
   /// arguments appended.
   pub fn command_argv(&self, name: &str, extra_args: &[String]) -> Option<Vec<String>> {
      let entry = self.commands.get(name)?;
      let mut argv = entry.argv().to_vec();
      argv.extend(extra_args.iter().cloned());
      if argv.is_empty() { None } else { Some(argv) }
   }
}

/// User-level configuration from `~/.codemcprc` (TOML).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserConfig {
   pub logger: LoggerConfig,
   pub files:  FilesConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
   /// DEBUG, INFO, WARNING, ERROR
   pub verbosity: Option<String>,
}

impl UserConfig {
   /// Load `~/.codemcprc`, falling back to defaults when missing or invalid.
   pub fn load() -> Self {
      let Some(path) = Self::path() else {
         return Self::default();
      };
      if !path.exists() {
         return Self::default();
      }
      std::fs::read_to_string(&path)
         .ok()
         .and_then(|contents| toml::from_str(&contents).ok())
         .unwrap_or_default()
   }

   pub fn path() -> Option<PathBuf> {
      std::env::var("HOME")
         .or_else(|_| std::env::var("USERPROFILE"))
         .ok()
         .map(|home| PathBuf::from(home).join(".codemcprc"))
   }
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_parse_commands_list_form() {
      let config: ProjectConfig = toml::from_str(
         r#"
         project_prompt = "Be careful."

         [commands]
         format = ["./run_format.sh"]
         "#,
      )
      .unwrap();

      assert_eq!(config.project_prompt.as_deref(), Some("Be careful."));
      assert_eq!(config.command_argv("format", &[]), Some(vec!["./run_format.sh".to_string()]));
      assert_eq!(config.command_argv("lint", &[]), None);
   }

   #[test]
   fn test_parse_commands_table_form() {
      let config: ProjectConfig = toml::from_str(
         r#"
         [commands.test]
         command = ["cargo", "test"]
         doc = "Accepts a test name filter as an argument."
         "#,
      )
      .unwrap();

      let entry = config.commands.get("test").unwrap();
      assert_eq!(entry.argv(), ["cargo", "test"]);
      assert_eq!(entry.doc(), Some("Accepts a test name filter as an argument."));
   }

   #[test]
   fn test_extra_args_appended() {
      let config: ProjectConfig = toml::from_str(
         r#"
         [commands]
         test = ["cargo", "test"]
         "#,
      )
      .unwrap();

      let argv = config.command_argv("test", &["my_test".to_string()]).unwrap();
      assert_eq!(argv, ["cargo", "test", "my_test"]);
   }

   #[test]
   fn test_unknown_keys_ignored() {
      let config: ProjectConfig = toml::from_str(
         r#"
         totally_unknown = 42

         [files]
         line_endings = "CRLF"
         "#,
      )
      .unwrap();

      assert_eq!(config.files.line_endings.as_deref(), Some("CRLF"));
   }
}
