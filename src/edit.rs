//! Tolerant single-occurrence text replacement
//!
//! The matching ladder, in order: exact substring match, context-anchored
//! `...` sentinel match for ambiguous snippets, trailing-whitespace-stripped
//! line match, leading-whitespace-tolerant line match. Ambiguous or missing
//! matches are refused rather than guessed; there is no fuzzy edit-distance
//! fallback. Input is expected to be LF-normalised.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{CodeMcpError, Result};

static DOTS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\.\.\.\n").unwrap());

/// One replaced region, in unified-diff coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
   pub old_start: usize,
   pub old_lines: usize,
   pub new_start: usize,
   pub new_lines: usize,
   /// Removed lines prefixed `-`, added lines prefixed `+`.
   pub lines: Vec<String>,
}

fn make_hunk(line_num: usize, old_string: &str, new_string: &str) -> Hunk {
   let old_lines: Vec<&str> = old_string.split('\n').collect();
   let new_lines: Vec<&str> = new_string.split('\n').collect();
   let mut lines: Vec<String> = old_lines.iter().map(|l| format!("-{l}")).collect();
   lines.extend(new_lines.iter().map(|l| format!("+{l}")));

   Hunk {
      old_start: line_num + 1,
      old_lines: old_lines.len(),
      new_start: line_num + 1,
      new_lines: new_lines.len(),
      lines,
   }
}

/// Apply an edit to content, returning the hunks and the updated content.
pub fn apply_edit(content: &str, old_string: &str, new_string: &str) -> Result<(Vec<Hunk>, String)> {
   // Creating new content from scratch.
   if old_string.trim().is_empty() {
      let hunk = Hunk {
         old_start: 1,
         old_lines: 0,
         new_start: 1,
         new_lines: new_string.split('\n').count(),
         lines:     new_string.split('\n').map(|l| format!("+{l}")).collect(),
      };
      return Ok((vec![hunk], new_string.to_string()));
   }

   // Exact substring match.
   let occurrences = content.matches(old_string).count();
   if occurrences == 1 {
      let line_num = content.split(old_string).next().unwrap_or("").matches('\n').count();
      let updated = content.replacen(old_string, new_string, 1);
      return Ok((vec![make_hunk(line_num, old_string, new_string)], updated));
   }
   if occurrences > 1 {
      // Context-anchored replacement can disambiguate a multi-match snippet.
      if let Ok(Some(updated)) = try_dotdotdots(content, old_string, new_string) {
         tracing::debug!("Used context-anchored strategy to handle multiple occurrences");
         let line_num = content.split(old_string).next().unwrap_or("").matches('\n').count();
         return Ok((vec![make_hunk(line_num, old_string, new_string)], updated));
      }
      return Err(CodeMcpError::AmbiguousMatch { count: occurrences });
   }

   // The sentinel form usually reaches this point: a snippet with `...`
   // lines never occurs verbatim, so each segment anchors independently.
   if DOTS_RE.is_match(old_string) {
      return match try_dotdotdots(content, old_string, new_string)? {
         Some(updated) => {
            tracing::debug!("Used context-anchored strategy for segmented match");
            Ok((vec![make_hunk(0, old_string, new_string)], updated))
         },
         None => Err(CodeMcpError::NoMatch),
      };
   }

   // Trailing-whitespace-stripped line match.
   if let Some(result) = replace_whitespace_stripped(content, old_string, new_string)? {
      return Ok(result);
   }

   // Leading-whitespace-tolerant line match.
   if let Some(result) = replace_leading_whitespace(content, old_string, new_string) {
      return Ok(result);
   }

   Err(CodeMcpError::NoMatch)
}

/// Match the snippet line-by-line with trailing whitespace stripped from
/// both sides. Requires a unique match.
fn replace_whitespace_stripped(
   content: &str,
   old_string: &str,
   new_string: &str,
) -> Result<Option<(Vec<Hunk>, String)>> {
   let content_lines: Vec<&str> = content.split('\n').collect();
   let old_lines: Vec<&str> = old_string.split('\n').collect();

   if old_lines.len() > content_lines.len() {
      return Ok(None);
   }

   let old_stripped: Vec<&str> = old_lines.iter().map(|l| l.trim_end()).collect();
   let mut matches: Vec<usize> = Vec::new();
   for start in 0..=(content_lines.len() - old_lines.len()) {
      let window = &content_lines[start..start + old_lines.len()];
      if window.iter().map(|l| l.trim_end()).eq(old_stripped.iter().copied()) {
         matches.push(start);
      }
   }

   match matches.len() {
      0 => Ok(None),
      1 => {
         let line_num = matches[0];
         let mut result_lines: Vec<&str> = Vec::new();
         result_lines.extend(&content_lines[..line_num]);
         result_lines.extend(new_string.split('\n'));
         result_lines.extend(&content_lines[line_num + old_lines.len()..]);
         let updated = result_lines.join("\n");

         Ok(Some((vec![make_hunk(line_num, old_string, new_string)], updated)))
      },
      n => Err(CodeMcpError::AmbiguousMatch { count: n }),
   }
}

/// Match the snippet modulo a uniform leading-whitespace prefix, and carry
/// that prefix over to the replacement.
fn replace_leading_whitespace(
   content: &str,
   old_string: &str,
   new_string: &str,
) -> Option<(Vec<Hunk>, String)> {
   let content_lines: Vec<&str> = content.split('\n').collect();

   // Outdent the snippet and replacement by their common indentation first.
   let leading = |s: &str| s.len() - s.trim_start().len();
   let min_indent = old_string
      .split('\n')
      .chain(new_string.split('\n'))
      .filter(|l| !l.trim().is_empty())
      .map(leading)
      .min()
      .unwrap_or(0);

   let outdent = |text: &str| -> Vec<String> {
      text
         .split('\n')
         .map(|l| if l.trim().is_empty() { l.to_string() } else { l[min_indent..].to_string() })
         .collect()
   };
   let old_lines = outdent(old_string);
   let new_lines = outdent(new_string);

   if old_lines.len() > content_lines.len() {
      return None;
   }

   for start in 0..=(content_lines.len() - old_lines.len()) {
      let window = &content_lines[start..start + old_lines.len()];

      if !window
         .iter()
         .zip(&old_lines)
         .all(|(w, o)| w.trim_start() == o.trim_start())
      {
         continue;
      }

      // All lines must share one added prefix.
      if window.iter().zip(&old_lines).any(|(w, o)| w.len() < o.len()) {
         continue;
      }
      let mut prefixes: Vec<&str> = window
         .iter()
         .zip(&old_lines)
         .filter(|(w, _)| !w.trim().is_empty())
         .map(|(w, o)| &w[..w.len() - o.len()])
         .collect();
      prefixes.dedup();
      let [prefix] = prefixes.as_slice() else {
         continue;
      };

      let replaced: Vec<String> = new_lines
         .iter()
         .map(|l| if l.trim().is_empty() { l.clone() } else { format!("{prefix}{l}") })
         .collect();

      let mut result_lines: Vec<String> =
         content_lines[..start].iter().map(ToString::to_string).collect();
      result_lines.extend(replaced);
      result_lines.extend(content_lines[start + old_lines.len()..].iter().map(ToString::to_string));

      return Some((vec![make_hunk(start, old_string, new_string)], result_lines.join("\n")));
   }

   None
}

/// Handle snippets that elide context with a `...` sentinel line.
///
/// Both snippets split into segments around the sentinels; the sentinel
/// lines themselves must be identical between old and new, and every
/// non-empty old segment must match exactly once. Returns `Ok(None)` when
/// no sentinel is present, an error when the sentinels are inconsistent or
/// a segment is missing or ambiguous.
fn try_dotdotdots(whole: &str, part: &str, replace: &str) -> Result<Option<String>> {
   let part_pieces = split_keeping_dots(part);
   let replace_pieces = split_keeping_dots(replace);

   if part_pieces.len() != replace_pieces.len() {
      return Err(CodeMcpError::Other("Unpaired ... in edit snippet".to_string()));
   }
   if part_pieces.len() == 1 {
      return Ok(None);
   }

   // Sentinel pieces sit at odd indices and must agree pairwise.
   let dots_match = part_pieces
      .iter()
      .zip(&replace_pieces)
      .skip(1)
      .step_by(2)
      .all(|(p, r)| p == r);
   if !dots_match {
      return Err(CodeMcpError::Other("Unmatched ... in edit snippet".to_string()));
   }

   let parts = part_pieces.iter().step_by(2);
   let replaces = replace_pieces.iter().step_by(2);

   let mut whole = whole.to_string();
   for (part, replace) in parts.zip(replaces) {
      if part.is_empty() && replace.is_empty() {
         continue;
      }
      if part.is_empty() {
         if !whole.ends_with('\n') {
            whole.push('\n');
         }
         whole.push_str(replace);
         continue;
      }

      let count = whole.matches(part.as_str()).count();
      if count == 0 {
         return Err(CodeMcpError::NoMatch);
      }
      if count > 1 {
         return Err(CodeMcpError::AmbiguousMatch { count });
      }
      whole = whole.replacen(part.as_str(), replace, 1);
   }

   Ok(Some(whole))
}

/// Split text on `...` sentinel lines, keeping the sentinels at odd indices.
fn split_keeping_dots(text: &str) -> Vec<String> {
   let mut pieces = Vec::new();
   let mut last = 0;
   for m in DOTS_RE.find_iter(text) {
      pieces.push(text[last..m.start()].to_string());
      pieces.push(m.as_str().to_string());
      last = m.end();
   }
   pieces.push(text[last..].to_string());
   pieces
}
