//! Line ending detection and handling
//!
//! Content is normalised to LF on read; the detected or configured style is
//! reapplied on write. Preference resolution walks nearest-ancestor
//! `.editorconfig`, then `.gitattributes`, then `codemcp.toml`, then the
//! user's `~/.codemcprc`, then the OS default.

use std::{
   fs,
   io::Read,
   path::{Path, PathBuf},
};

use crate::{
   config::{ProjectConfig, UserConfig},
   glob::{self, GlobOptions},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
   Lf,
   Crlf,
}

impl LineEnding {
   pub fn as_str(self) -> &'static str {
      match self {
         Self::Lf => "\n",
         Self::Crlf => "\r\n",
      }
   }

   pub fn name(self) -> &'static str {
      match self {
         Self::Lf => "LF",
         Self::Crlf => "CRLF",
      }
   }

   pub fn from_name(name: &str) -> Option<Self> {
      match name.to_uppercase().as_str() {
         "LF" => Some(Self::Lf),
         "CRLF" => Some(Self::Crlf),
         _ => None,
      }
   }

   const fn os_default() -> Self {
      if cfg!(windows) { Self::Crlf } else { Self::Lf }
   }
}

/// Normalize all line endings to LF.
pub fn normalize_to_lf(content: &str) -> String {
   content.replace("\r\n", "\n").replace('\r', "\n")
}

/// Apply the specified line ending to LF-normalised content.
pub fn apply_line_endings(content: &str, line_ending: LineEnding) -> String {
   let normalized = normalize_to_lf(content);
   match line_ending {
      LineEnding::Lf => normalized,
      LineEnding::Crlf => normalized.replace('\n', "\r\n"),
   }
}

/// Strip trailing whitespace from each line, guarantee a single final
/// newline, then apply the requested line ending.
pub fn prepare_for_write(content: &str, line_ending: LineEnding) -> String {
   let normalized = normalize_to_lf(content);
   let mut stripped = normalized
      .split('\n')
      .map(str::trim_end)
      .collect::<Vec<_>>()
      .join("\n");

   while stripped.ends_with('\n') {
      stripped.pop();
   }
   stripped.push('\n');

   apply_line_endings(&stripped, line_ending)
}

/// Write text content with the requested line ending, creating parent
/// directories as needed and verifying the on-disk bytes afterwards so no
/// write is reported successful without actually landing.
pub fn write_text_file(
   file_path: &Path,
   content: &str,
   line_ending: LineEnding,
) -> crate::error::Result<()> {
   let final_content = prepare_for_write(content, line_ending);

   if let Some(parent) = file_path.parent() {
      fs::create_dir_all(parent)?;
   }
   fs::write(file_path, &final_content)?;

   let written = fs::read(file_path)?;
   if written != final_content.as_bytes() {
      return Err(crate::error::CodeMcpError::Other(format!(
         "Write verification failed for {}",
         file_path.display()
      )));
   }
   Ok(())
}

/// Detect the line ending of an existing file by sampling its first bytes.
/// Falls back to the configured preference when the file does not exist.
pub fn detect_line_endings(file_path: &Path) -> LineEnding {
   if !file_path.exists() {
      return line_ending_preference(file_path);
   }

   let mut sample = [0_u8; 4096];
   let read = fs::File::open(file_path)
      .and_then(|mut f| f.read(&mut sample))
      .unwrap_or(0);

   if sample[..read].windows(2).any(|w| w == b"\r\n") {
      LineEnding::Crlf
   } else {
      LineEnding::Lf
   }
}

/// Line ending for new files created under `directory`.
pub fn detect_repo_line_endings(directory: &Path) -> LineEnding {
   line_ending_preference(&directory.join("dummy.txt"))
}

/// Resolve the configured line-ending preference for `file_path`.
pub fn line_ending_preference(file_path: &Path) -> LineEnding {
   check_editorconfig(file_path)
      .or_else(|| check_gitattributes(file_path))
      .or_else(|| check_project_config(file_path))
      .or_else(check_user_config)
      .unwrap_or(LineEnding::os_default())
}

/// Walk up from `start`, returning the nearest ancestor containing `name`.
fn find_ancestor_with(start: &Path, name: &str) -> Option<PathBuf> {
   let mut dir = start.parent()?;
   loop {
      let candidate = dir.join(name);
      if candidate.exists() {
         return Some(candidate);
      }
      dir = dir.parent()?;
   }
}

fn check_editorconfig(file_path: &Path) -> Option<LineEnding> {
   let ec_path = find_ancestor_with(file_path, ".editorconfig")?;
   let content = fs::read_to_string(&ec_path).ok()?;
   let file_name = file_path.file_name()?.to_str()?;

   // Collect matching sections; the most specific pattern wins.
   let mut sections: Vec<(&str, Vec<&str>)> = Vec::new();
   let mut current: Option<(&str, Vec<&str>)> = None;
   for line in content.lines() {
      let trimmed = line.trim();
      if trimmed.starts_with('[') && trimmed.ends_with(']') {
         if let Some(section) = current.take() {
            sections.push(section);
         }
         current = Some((&trimmed[1..trimmed.len() - 1], Vec::new()));
      } else if let Some((_, body)) = current.as_mut() {
         body.push(trimmed);
      }
   }
   if let Some(section) = current.take() {
      sections.push(section);
   }

   let mut matching: Vec<&(&str, Vec<&str>)> = sections
      .iter()
      .filter(|(pattern, _)| glob::matches(pattern, file_name, GlobOptions::EDITORCONFIG))
      .collect();
   matching.sort_by_key(|(pattern, _)| pattern.len());

   for (_, body) in matching.iter().rev() {
      for line in body {
         if let Some(value) = line.strip_prefix("end_of_line") {
            let value = value.trim_start_matches([' ', '=']).trim();
            match value.to_lowercase().as_str() {
               "crlf" => return Some(LineEnding::Crlf),
               "lf" => return Some(LineEnding::Lf),
               _ => {},
            }
         }
      }
   }
   None
}

fn check_gitattributes(file_path: &Path) -> Option<LineEnding> {
   let ga_path = find_ancestor_with(file_path, ".gitattributes")?;
   let content = fs::read_to_string(&ga_path).ok()?;
   let file_name = file_path.file_name()?.to_str()?;

   // Later lines take precedence in gitattributes.
   for line in content.lines().rev() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
         continue;
      }
      let mut parts = line.split_whitespace();
      let Some(pattern) = parts.next() else { continue };
      if pattern != "*" && !glob::matches(pattern, file_name, GlobOptions::GITIGNORE) {
         continue;
      }
      for attr in parts {
         match attr {
            "eol=crlf" => return Some(LineEnding::Crlf),
            "eol=lf" | "text" => return Some(LineEnding::Lf),
            "-text" | "binary" => return None,
            _ => {},
         }
      }
   }
   None
}

fn check_project_config(file_path: &Path) -> Option<LineEnding> {
   let config_path = find_ancestor_with(file_path, "codemcp.toml")?;
   let config = ProjectConfig::from_file(&config_path).ok()?;
   config.files.line_endings.as_deref().and_then(LineEnding::from_name)
}

fn check_user_config() -> Option<LineEnding> {
   let config = UserConfig::load();
   config.files.line_endings.as_deref().and_then(LineEnding::from_name)
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_normalize_mixed_endings() {
      assert_eq!(normalize_to_lf("a\r\nb\rc\nd"), "a\nb\nc\nd");
   }

   #[test]
   fn test_apply_crlf() {
      assert_eq!(apply_line_endings("a\nb\n", LineEnding::Crlf), "a\r\nb\r\n");
   }

   #[test]
   fn test_prepare_strips_trailing_whitespace() {
      assert_eq!(prepare_for_write("a  \nb\t\n", LineEnding::Lf), "a\nb\n");
   }

   #[test]
   fn test_prepare_guarantees_single_final_newline() {
      assert_eq!(prepare_for_write("a", LineEnding::Lf), "a\n");
      assert_eq!(prepare_for_write("a\n\n\n", LineEnding::Lf), "a\n");
   }

   #[test]
   fn test_detect_from_bytes() {
      let dir = std::env::temp_dir();
      let crlf_path = dir.join("codemcp_test_crlf.txt");
      fs::write(&crlf_path, "one\r\ntwo\r\n").unwrap();
      assert_eq!(detect_line_endings(&crlf_path), LineEnding::Crlf);
      fs::remove_file(&crlf_path).ok();

      let lf_path = dir.join("codemcp_test_lf.txt");
      fs::write(&lf_path, "one\ntwo\n").unwrap();
      assert_eq!(detect_line_endings(&lf_path), LineEnding::Lf);
      fs::remove_file(&lf_path).ok();
   }
}
