//! Single-occurrence file edits

use std::path::{Path, PathBuf};

use crate::{
   commit::{append_commit_hash, commit_changes},
   edit::apply_edit,
   error::{CodeMcpError, Result},
   guard,
   line_endings::{detect_line_endings, normalize_to_lf, write_text_file},
   output::edit_snippet,
   state::ReadTimestamps,
};

/// Replace exactly one occurrence of `old_string` with `new_string` in a
/// file, or create the file when `old_string` is empty, and commit.
pub fn edit_file(
   path: &str,
   old_string: &str,
   new_string: &str,
   description: &str,
   chat_id: &str,
   read_state: &ReadTimestamps,
) -> Result<String> {
   // Tolerate CRLF in caller-provided snippets.
   let old_string = normalize_to_lf(old_string);
   let new_string = normalize_to_lf(new_string);

   let (full_path, _repo_root) = guard::check_mutable_path(path, chat_id)?;

   if old_string == new_string {
      return Ok("No changes to make: old_string and new_string are exactly the same.".to_string());
   }

   // Creating a new file.
   if old_string.is_empty() {
      if full_path.exists() {
         return Err(CodeMcpError::Other(
            "Cannot create new file - file already exists.".to_string(),
         ));
      }
      let line_ending = detect_line_endings(&full_path);
      write_text_file(&full_path, &new_string, line_ending)?;
      read_state.record(&full_path);

      let git_message = commit_message_suffix(
         commit_changes(&full_path, description, chat_id, false, false),
         description,
         "\n",
      );
      let result = format!("Successfully created {}{git_message}", full_path.display());
      return Ok(append_commit_hash(&result, &full_path));
   }

   if !full_path.exists() {
      let mut message = format!("File does not exist: {}", full_path.display());
      if let Some(similar) = find_similar_file(&full_path) {
         message.push_str(&format!(" Did you mean {}?", similar.display()));
      }
      return Err(CodeMcpError::NotFound(message));
   }

   if full_path.is_dir() {
      return Err(CodeMcpError::IsADirectory(path.to_string()));
   }

   // Reject edits against content the session has not seen.
   read_state.check_fresh(&full_path)?;

   let line_ending = detect_line_endings(&full_path);
   let raw = std::fs::read_to_string(&full_path)?;
   let content = normalize_to_lf(&raw);

   let (_hunks, updated) = apply_edit(&content, &old_string, &new_string)?;

   write_text_file(&full_path, &updated, line_ending)?;
   read_state.record(&full_path);

   let snippet = edit_snippet(&content, &old_string, &new_string, 4);

   let git_message = commit_message_suffix(
      commit_changes(&full_path, description, chat_id, false, false),
      description,
      "\n\n",
   );

   let result = format!(
      "Successfully edited {}\n\nHere's a snippet of the edited file:\n{snippet}{git_message}",
      full_path.display()
   );
   Ok(append_commit_hash(&result, &full_path))
}

fn commit_message_suffix(
   outcome: Result<String>,
   description: &str,
   separator: &str,
) -> String {
   match outcome {
      Ok(message) if message.contains("previous commit was") => format!("{separator}{message}"),
      Ok(_) => format!("{separator}Changes committed to git: {description}"),
      Err(e) => format!("{separator}Failed to commit changes to git: {e}"),
   }
}

/// Look for a sibling file sharing the same stem, to suggest on typos like
/// `.ts` vs `.tsx`.
fn find_similar_file(file_path: &Path) -> Option<PathBuf> {
   let directory = file_path.parent()?;
   if !directory.exists() {
      return None;
   }
   let stem = file_path.file_stem()?.to_str()?;
   let own_name = file_path.file_name()?;

   for entry in std::fs::read_dir(directory).ok()? {
      let entry = entry.ok()?;
      let name = entry.file_name();
      if name == own_name {
         continue;
      }
      if let Some(name_str) = name.to_str()
         && name_str.strip_prefix(stem).is_some_and(|rest| rest.starts_with('.'))
      {
         return Some(directory.join(name));
      }
   }
   None
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_find_similar_file() {
      let dir = std::env::temp_dir().join("codemcp_similar_test");
      std::fs::create_dir_all(&dir).unwrap();
      std::fs::write(dir.join("widget.tsx"), "x").unwrap();

      let similar = find_similar_file(&dir.join("widget.ts")).unwrap();
      assert!(similar.ends_with("widget.tsx"));

      assert!(find_similar_file(&dir.join("unrelated.rs")).is_none());
      std::fs::remove_dir_all(&dir).ok();
   }
}
