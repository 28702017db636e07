//! Structured commit messages
//!
//! Every commit this crate produces carries a fenced ```git-revs block
//! recording the base revision and one line per sub-edit, followed by a
//! `codemcp-id` trailer. This module parses and rewrites those messages
//! while preserving any third-party trailers verbatim.

use regex::Regex;
use std::sync::LazyLock;

/// The session trailer key recognised on read and rewritten on amend.
pub const CHAT_ID_TRAILER: &str = "codemcp-id";

static TRAILER_RE: LazyLock<Regex> = LazyLock::new(|| {
   Regex::new(r"^([A-Za-z0-9][A-Za-z0-9_.-]*(?:-[A-Za-z0-9_.-]+)*):\s*(.*)$").unwrap()
});

static CHAT_ID_RE: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"codemcp-id:\s*([A-Za-z0-9-]+)").unwrap());

static GIT_REVS_RE: LazyLock<Regex> =
   LazyLock::new(|| Regex::new(r"(?s)```git-revs\n(.*?)\n```").unwrap());

/// One entry of a trailer block, kept verbatim so external tooling's
/// trailers survive amends byte-for-byte. Continuation lines (indented)
/// stay attached to their entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
   /// Parsed key when the entry is `Key: Value` shaped.
   pub key: Option<String>,
   /// The raw line(s), exactly as they appeared.
   pub raw: String,
}

/// Extract the chat ID from a commit message. When the trailer appears more
/// than once (legacy messages), the last occurrence wins.
pub fn extract_chat_id(message: &str) -> Option<String> {
   CHAT_ID_RE
      .captures_iter(message)
      .last()
      .map(|c| c[1].trim().to_string())
}

/// Parse a commit message into the main message and its trailer block.
///
/// The trailer block is the final blank-line-separated block that either
/// consists entirely of `Key: Value` lines (with indented continuations),
/// or carries a `codemcp-id` trailer with at least a quarter of its lines
/// being well-formed trailers. The lenient rule lets blocks survive that
/// external tooling extended with free-form lines.
pub fn parse_commit_message(message: &str) -> (String, Vec<Trailer>) {
   if message.is_empty() || !message.contains('\n') {
      // A single-line message can still be a bare trailer, but treating it
      // as the subject is what callers expect.
      return (message.to_string(), Vec::new());
   }

   let lines: Vec<&str> = message.lines().collect();

   // Split into blocks separated by blank lines, remembering where the
   // last block starts in the original text.
   let mut last_block_start = 0;
   let mut in_block = false;
   for (i, line) in lines.iter().enumerate() {
      if line.trim().is_empty() {
         in_block = false;
      } else if !in_block {
         in_block = true;
         last_block_start = i;
      }
   }

   if last_block_start == 0 {
      // Everything is one block; by convention the subject is not a
      // trailer block.
      return (message.to_string(), Vec::new());
   }

   let block_lines = &lines[last_block_start..];
   let Some(trailers) = parse_trailer_block(block_lines) else {
      return (message.to_string(), Vec::new());
   };

   let main_message = lines[..last_block_start].join("\n").trim_end().to_string();
   (main_message, trailers)
}

/// Parse a candidate block into trailers, or `None` when it is body text.
fn parse_trailer_block(block_lines: &[&str]) -> Option<Vec<Trailer>> {
   let mut trailers: Vec<Trailer> = Vec::new();
   let mut well_formed = 0_usize;
   let mut free_form = 0_usize;
   let mut has_chat_id = false;

   for line in block_lines {
      if line.trim().is_empty() {
         continue;
      }
      if let Some(caps) = TRAILER_RE.captures(line) {
         if caps[1].eq_ignore_ascii_case(CHAT_ID_TRAILER) {
            has_chat_id = true;
         }
         well_formed += 1;
         trailers.push(Trailer { key: Some(caps[1].to_string()), raw: (*line).to_string() });
      } else if line.starts_with(' ') && !trailers.is_empty() {
         // Continuation of the previous entry.
         let last = trailers.last_mut().unwrap();
         last.raw.push('\n');
         last.raw.push_str(line);
      } else {
         free_form += 1;
         trailers.push(Trailer { key: None, raw: (*line).to_string() });
      }
   }

   if trailers.is_empty() {
      return None;
   }

   // Strict rule: all entries well-formed. Lenient rule: our own trailer
   // anchors the block and at least 25% of the lines parse.
   if free_form == 0 || (has_chat_id && well_formed * 4 >= well_formed + free_form) {
      Some(trailers)
   } else {
      None
   }
}

/// Re-emit a message with its trailer block, dropping any existing
/// `codemcp-id` entries and appending a single fresh one last.
fn render_with_trailers(main_message: &str, trailers: &[Trailer], chat_id: &str) -> String {
   let mut result = main_message.trim_end().to_string();
   result.push_str("\n\n");

   for trailer in trailers {
      if trailer
         .key
         .as_deref()
         .is_some_and(|k| k.eq_ignore_ascii_case(CHAT_ID_TRAILER))
      {
         continue;
      }
      result.push_str(&trailer.raw);
      result.push('\n');
   }

   result.push_str(&format!("{CHAT_ID_TRAILER}: {chat_id}"));
   result
}

/// Attach the `codemcp-id` trailer to a message, preserving any existing
/// trailers verbatim.
pub fn set_chat_id(message: &str, chat_id: &str) -> String {
   let (main_message, trailers) = parse_commit_message(message);
   render_with_trailers(&main_message, &trailers, chat_id)
}

/// Rewrite a `HEAD` entry line, replacing the placeholder with a real short
/// hash and trimming the alignment padding that `HEAD` carried.
fn resolve_head_line(line: &str, commit_hash: &str) -> String {
   let Some(head_pos) = line.find("HEAD") else {
      return line.to_string();
   };
   let prefix = &line[..head_pos];
   let mut suffix = &line[head_pos + 4..];

   // `HEAD` is 4 chars against a 7-char hash; drop the pad spaces.
   let pad = commit_hash.len().saturating_sub(4);
   if pad > 0 && suffix.len() >= pad && suffix[..pad].chars().all(|c| c == ' ') {
      suffix = &suffix[pad..];
   }
   format!("{prefix}{commit_hash}{suffix}")
}

fn head_entry(commit_hash_len: usize, description: &str) -> String {
   let pad = " ".repeat(commit_hash_len.saturating_sub(4));
   format!("HEAD{pad}  {description}")
}

/// Update a commit message's revision block with a new sub-edit.
///
/// The existing `HEAD` placeholder line (if any) is rewritten to
/// `commit_hash`, a new `HEAD  <description>` line is appended, and all
/// trailers outside the block are preserved. When no fenced block exists
/// yet, legacy inline `(Base revision)` / `HEAD` lines are migrated into a
/// freshly created block; when there are none, a new block is seeded with
/// `commit_hash` as the base revision.
pub fn update_message_with_revision(
   message: &str,
   description: &str,
   commit_hash: &str,
   chat_id: &str,
) -> String {
   let (main_message, trailers) = parse_commit_message(message);

   let result_message = if let Some(caps) = GIT_REVS_RE.captures(&main_message) {
      let block_content = caps.get(1).map_or("", |m| m.as_str());

      let mut new_lines: Vec<String> = block_content
         .lines()
         .map(|line| {
            if line.trim_start().starts_with("HEAD") {
               resolve_head_line(line, commit_hash)
            } else {
               line.to_string()
            }
         })
         .collect();
      new_lines.push(head_entry(commit_hash.len(), description));

      let replacement = format!("```git-revs\n{}\n```", new_lines.join("\n"));
      GIT_REVS_RE
         .replace(&main_message, regex::NoExpand(&replacement))
         .to_string()
   } else {
      // No fenced block yet: collect any legacy inline revision lines and
      // migrate them, seeding a base revision when absent.
      let mut main_lines: Vec<&str> = Vec::new();
      let mut revision_lines: Vec<String> = Vec::new();
      let mut has_base_revision = false;

      for line in main_message.lines() {
         if line.contains("(Base revision)") || line.trim_start().starts_with("HEAD") {
            has_base_revision = has_base_revision || line.contains("(Base revision)");
            revision_lines.push(line.to_string());
         } else {
            main_lines.push(line);
         }
      }

      if !has_base_revision {
         revision_lines.insert(0, format!("{commit_hash}  (Base revision)"));
      }

      let mut resolved: Vec<String> = revision_lines
         .iter()
         .map(|line| {
            if line.trim_start().starts_with("HEAD") {
               resolve_head_line(line, commit_hash)
            } else {
               line.clone()
            }
         })
         .collect();
      resolved.push(head_entry(commit_hash.len(), description));

      let block = format!("```git-revs\n{}\n```", resolved.join("\n"));

      while main_lines.last().is_some_and(|l| l.trim().is_empty()) {
         main_lines.pop();
      }
      if main_lines.is_empty() {
         block
      } else {
         format!("{}\n\n{block}", main_lines.join("\n"))
      }
   };

   render_with_trailers(&result_message, &trailers, chat_id)
}
