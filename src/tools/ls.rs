//! Directory listing

use std::{collections::VecDeque, path::Path};

use crate::{
   error::{CodeMcpError, Result},
   guard,
};

const MAX_FILES: usize = 1000;

/// List a directory as an indented tree, up to 1000 entries. Dotfiles and
/// build cache directories are skipped.
pub fn ls_directory(path: &str) -> Result<String> {
   let full_path = guard::normalize_file_path(path)?;

   if !full_path.exists() {
      return Err(CodeMcpError::NotFound(format!("Directory does not exist: {path}")));
   }
   if !full_path.is_dir() {
      return Err(CodeMcpError::NotADirectory(path.to_string()));
   }

   let mut entries = collect_entries(&full_path);
   entries.sort();

   let tree = render_tree(&full_path, &entries);

   if entries.len() > MAX_FILES {
      Ok(format!(
         "There are more than {MAX_FILES} files in the directory. Use more specific paths to explore nested directories. The first {MAX_FILES} files and directories are included below:\n\n{tree}"
      ))
   } else {
      Ok(tree)
   }
}

/// Breadth-first listing of relative paths; directories carry a trailing
/// slash. Stops once the cap is exceeded.
fn collect_entries(root: &Path) -> Vec<String> {
   let mut results: Vec<String> = Vec::new();
   let mut queue: VecDeque<std::path::PathBuf> = VecDeque::new();
   queue.push_back(root.to_path_buf());

   while let Some(dir) = queue.pop_front() {
      if results.len() > MAX_FILES {
         break;
      }
      let Ok(read) = std::fs::read_dir(&dir) else {
         continue;
      };
      for entry in read.flatten() {
         let path = entry.path();
         if skip(&path) {
            continue;
         }
         let Ok(rel) = path.strip_prefix(root) else {
            continue;
         };
         let rel_str = rel.display().to_string();
         if path.is_dir() {
            results.push(format!("{rel_str}/"));
            queue.push_back(path);
         } else {
            results.push(rel_str);
         }
         if results.len() > MAX_FILES {
            break;
         }
      }
   }

   results.truncate(MAX_FILES);
   results
}

fn skip(path: &Path) -> bool {
   let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
      return true;
   };
   name.starts_with('.') || name == "__pycache__"
}

fn render_tree(root: &Path, entries: &[String]) -> String {
   let mut out = format!("- {}/\n", root.display());
   for entry in entries {
      let trimmed = entry.trim_end_matches('/');
      let depth = trimmed.matches('/').count();
      let name = trimmed.rsplit('/').next().unwrap_or(trimmed);
      let suffix = if entry.ends_with('/') { "/" } else { "" };
      out.push_str(&"  ".repeat(depth + 1));
      out.push_str(&format!("- {name}{suffix}\n"));
   }
   out
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_listing_skips_dotfiles() {
      let dir = std::env::temp_dir().join("codemcp_ls_test");
      std::fs::create_dir_all(dir.join("sub")).unwrap();
      std::fs::write(dir.join("visible.txt"), "x").unwrap();
      std::fs::write(dir.join(".hidden"), "x").unwrap();
      std::fs::write(dir.join("sub/nested.txt"), "x").unwrap();

      let out = ls_directory(dir.to_str().unwrap()).unwrap();
      assert!(out.contains("- visible.txt"));
      assert!(out.contains("- sub/"));
      assert!(out.contains("- nested.txt"));
      assert!(!out.contains(".hidden"));

      std::fs::remove_dir_all(&dir).ok();
   }

   #[test]
   fn test_not_a_directory() {
      let file = std::env::temp_dir().join("codemcp_ls_file.txt");
      std::fs::write(&file, "x").unwrap();
      let err = ls_directory(file.to_str().unwrap()).unwrap_err();
      assert!(matches!(err, CodeMcpError::NotADirectory(_)));
      std::fs::remove_file(&file).ok();
   }
}
