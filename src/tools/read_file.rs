//! File reading with numbered output

use crate::{
   error::{CodeMcpError, Result},
   guard,
   line_endings::normalize_to_lf,
   output::{MAX_LINE_LENGTH, MAX_LINES_TO_READ},
   state::ReadTimestamps,
};

/// Read a file, returning numbered content. `offset` is a 1-based starting
/// line; `limit` caps the number of lines (default 1000). Records the read
/// timestamp so later edits can detect external modifications.
pub fn read_file(
   path: &str,
   offset: Option<usize>,
   limit: Option<usize>,
   read_state: &ReadTimestamps,
) -> Result<String> {
   let full_path = guard::normalize_file_path(path)?;

   if !full_path.exists() {
      return Err(CodeMcpError::NotFound(format!("File does not exist: {path}")));
   }
   if full_path.is_dir() {
      return Err(CodeMcpError::IsADirectory(path.to_string()));
   }

   let bytes = std::fs::read(&full_path)?;
   let Ok(text) = String::from_utf8(bytes) else {
      return Ok("[Binary content cannot be displayed]".to_string());
   };
   let content = normalize_to_lf(&text);

   let offset = offset.unwrap_or(1).max(1);
   let limit = limit.unwrap_or(MAX_LINES_TO_READ).min(MAX_LINES_TO_READ);

   let all_lines: Vec<&str> = content.lines().collect();
   let total = all_lines.len();

   if offset > total && total > 0 {
      return Err(CodeMcpError::Other(format!(
         "Offset {offset} is past the end of the file ({total} lines)"
      )));
   }

   let end = total.min(offset - 1 + limit);
   let mut numbered: Vec<String> = Vec::with_capacity(end.saturating_sub(offset - 1));
   for (idx, line) in all_lines[offset - 1..end].iter().enumerate() {
      let shown = if line.chars().count() > MAX_LINE_LENGTH {
         let prefix: String = line.chars().take(MAX_LINE_LENGTH).collect();
         format!("{prefix}... (line truncated)")
      } else {
         (*line).to_string()
      };
      numbered.push(format!("{:6}\t{shown}", offset + idx));
   }

   let mut result = numbered.join("\n");
   if end < total {
      result.push_str(&format!(
         "\n... (file truncated, showing lines {offset}-{end} of {total})"
      ));
   }

   read_state.record(&full_path);
   Ok(result)
}

#[cfg(test)]
mod tests {
   use super::*;

   fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
      let path = std::env::temp_dir().join(name);
      std::fs::write(&path, content).unwrap();
      path
   }

   #[test]
   fn test_numbered_output() {
      let path = write_temp("codemcp_read_numbered.txt", "alpha\nbeta\n");
      let state = ReadTimestamps::new();
      let out = read_file(path.to_str().unwrap(), None, None, &state).unwrap();
      assert_eq!(out, "     1\talpha\n     2\tbeta");
      assert!(state.has_read(&path));
      std::fs::remove_file(&path).ok();
   }

   #[test]
   fn test_offset_and_limit() {
      let content: Vec<String> = (1..=10).map(|i| format!("line{i}")).collect();
      let path = write_temp("codemcp_read_offset.txt", &content.join("\n"));
      let state = ReadTimestamps::new();
      let out = read_file(path.to_str().unwrap(), Some(3), Some(2), &state).unwrap();
      assert!(out.starts_with("     3\tline3\n     4\tline4"));
      assert!(out.contains("showing lines 3-4 of 10"));
      std::fs::remove_file(&path).ok();
   }

   #[test]
   fn test_missing_file() {
      let state = ReadTimestamps::new();
      let err = read_file("/no/such/file.txt", None, None, &state).unwrap_err();
      assert!(err.to_string().contains("does not exist"));
   }
}
