//! Output truncation policy
//!
//! Every string handed back to the caller (file reads, command output,
//! git query passthrough) funnels through the limits defined here.

pub const MAX_LINES_TO_READ: usize = 1000;
pub const MAX_LINE_LENGTH: usize = 1000;
pub const MAX_OUTPUT_SIZE: usize = 256 * 1024; // 0.25 MiB
pub const START_CONTEXT_LINES: usize = 5;

const BINARY_MARKER: &str = "[Binary content cannot be displayed]";

/// Truncate a single line to `MAX_LINE_LENGTH` characters.
fn truncate_line(line: &str) -> String {
   if line.chars().count() > MAX_LINE_LENGTH {
      let prefix: String = line.chars().take(MAX_LINE_LENGTH).collect();
      format!("{prefix}... (line truncated)")
   } else {
      line.to_string()
   }
}

/// Truncate command output, keeping the first `START_CONTEXT_LINES` lines and
/// as much of the tail as fits within `MAX_LINES_TO_READ`.
pub fn truncate_output(content: &[u8]) -> String {
   let Ok(text) = std::str::from_utf8(content) else {
      return BINARY_MARKER.to_string();
   };
   truncate_output_str(text, true)
}

/// Truncate output that is already valid UTF-8.
///
/// With `prefer_end` the head and tail are kept and the middle elided; without
/// it only the head survives (the policy used for file reads).
pub fn truncate_output_str(content: &str, prefer_end: bool) -> String {
   if content.is_empty() {
      return String::new();
   }

   let lines: Vec<&str> = content.lines().collect();
   let total_lines = lines.len();

   let result = if total_lines <= MAX_LINES_TO_READ {
      lines
         .iter()
         .map(|line| truncate_line(line))
         .collect::<Vec<_>>()
         .join("\n")
   } else if prefer_end {
      let start: Vec<String> = lines[..START_CONTEXT_LINES]
         .iter()
         .map(|line| truncate_line(line))
         .collect();
      let end_count = MAX_LINES_TO_READ - START_CONTEXT_LINES;
      let end: Vec<String> = lines[total_lines - end_count..]
         .iter()
         .map(|line| truncate_line(line))
         .collect();
      let omitted = total_lines - START_CONTEXT_LINES - end_count;

      format!(
         "{}\n\n... (output truncated, {omitted} lines omitted) ...\n\n{}",
         start.join("\n"),
         end.join("\n")
      )
   } else {
      let head: Vec<String> = lines[..MAX_LINES_TO_READ]
         .iter()
         .map(|line| truncate_line(line))
         .collect();
      format!(
         "{}\n... (output truncated, showing {MAX_LINES_TO_READ} of {total_lines} lines)",
         head.join("\n")
      )
   };

   // The line limits almost always fire first; the byte cap is the backstop.
   if result.len() > MAX_OUTPUT_SIZE {
      let mut cut = MAX_OUTPUT_SIZE;
      while !result.is_char_boundary(cut) {
         cut -= 1;
      }
      format!("{}... (output truncated)", &result[..cut])
   } else {
      result
   }
}

/// Render a numbered snippet of the edited region, with `context_lines` of
/// surrounding context on each side.
pub fn edit_snippet(original: &str, old_str: &str, new_str: &str, context_lines: usize) -> String {
   let before_text = original.split(old_str).next().unwrap_or("");
   let replacement_line = before_text.split('\n').count();

   let edited = original.replacen(old_str, new_str, 1);
   let edited_lines: Vec<&str> = edited.split('\n').collect();

   let start_line = replacement_line.saturating_sub(context_lines);
   let end_line = edited_lines
      .len()
      .min(replacement_line + context_lines + new_str.split('\n').count());

   edited_lines[start_line..end_line]
      .iter()
      .enumerate()
      .map(|(i, line)| format!("{:4} | {line}", start_line + i + 1))
      .collect::<Vec<_>>()
      .join("\n")
}
