//! Session tracking
//!
//! A chat session is keyed by an opaque chat ID embedded as a `codemcp-id`
//! trailer in every commit it produces. The tracker decides, for each
//! mutation, whether to amend the session's existing HEAD commit, promote
//! the prepared session ref into a real commit first, or start a new one.

use std::path::Path;

use regex::Regex;
use std::sync::LazyLock;

use crate::{
   error::{CodeMcpError, Result},
   git,
   message::extract_chat_id,
   shell::run_git,
};

static CHAT_ID_FORMAT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+$").unwrap());

/// Validate an inbound chat ID against the `[A-Za-z0-9-]+` format.
pub fn validate_chat_id(chat_id: &str) -> Result<()> {
   if CHAT_ID_FORMAT.is_match(chat_id) {
      Ok(())
   } else {
      Err(CodeMcpError::Other(format!("Invalid chat ID format: {chat_id}")))
   }
}

/// The git ref a session's prepared commit lives under.
pub fn session_ref_name(chat_id: &str) -> String {
   format!("refs/codemcp/{chat_id}")
}

/// Chat ID of the `HEAD` commit, if it carries one.
pub fn head_chat_id(repo_root: &Path) -> Result<Option<String>> {
   if !git::has_commits(repo_root)? {
      return Ok(None);
   }
   let message = git::head_commit_message(repo_root)?;
   Ok(extract_chat_id(&message))
}

/// Whether `refs/codemcp/<chat_id>` exists.
pub fn ref_exists(repo_root: &Path, chat_id: &str) -> Result<bool> {
   let ref_name = session_ref_name(chat_id);
   let output = run_git(&["show-ref", "--verify", &ref_name], repo_root, false)?;
   Ok(output.success())
}

/// True iff `HEAD` exists and already belongs to this session.
pub fn should_amend(repo_root: &Path, chat_id: &str) -> Result<bool> {
   Ok(head_chat_id(repo_root)?.as_deref() == Some(chat_id))
}

/// Promote the session ref into a real commit on `HEAD`.
///
/// Creates a commit whose tree is `HEAD`'s tree, parent is `HEAD`, and
/// message is the one stored on the session ref, then fast-forwards `HEAD`
/// to it. Used exactly once per session, when the first mutation occurs on
/// a `HEAD` that does not yet belong to the session.
pub fn promote_ref(repo_root: &Path, chat_id: &str) -> Result<()> {
   let ref_name = session_ref_name(chat_id);
   tracing::info!("Creating a new commit from reference {ref_name}");

   let head_hash = git::head_commit_hash(repo_root, false)?;
   let tree = git::tree_hash(repo_root, "HEAD")?;
   let ref_message = git::ref_commit_message(repo_root, &ref_name)?;

   let output = run_git(
      &["commit-tree", &tree, "-p", &head_hash, "-m", &ref_message],
      repo_root,
      true,
   )?;
   let new_commit = output.stdout_trimmed();

   run_git(&["update-ref", "HEAD", &new_commit], repo_root, true)?;
   tracing::info!("Promoted session reference for chat ID {chat_id}");
   Ok(())
}

/// Generate a fresh chat ID: a monotonically increasing counter persisted
/// under `~/.codemcp`, joined with a slug of the subject line.
pub fn generate_chat_id(subject_line: &str) -> String {
   let counter = next_counter().unwrap_or_else(|| {
      // Fall back to a time-derived value when the state dir is unusable.
      chrono::Utc::now().timestamp().unsigned_abs()
   });
   let slug = slugify(subject_line);
   if slug.is_empty() {
      format!("{counter}-chat")
   } else {
      format!("{counter}-{slug}")
   }
}

fn next_counter() -> Option<u64> {
   let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")).ok()?;
   let dir = std::path::PathBuf::from(home).join(".codemcp");
   std::fs::create_dir_all(&dir).ok()?;
   let counter_path = dir.join("counter");

   let current: u64 = std::fs::read_to_string(&counter_path)
      .ok()
      .and_then(|s| s.trim().parse().ok())
      .unwrap_or(0);
   let next = current + 1;
   std::fs::write(&counter_path, next.to_string()).ok()?;
   Some(next)
}

fn slugify(text: &str) -> String {
   let mut slug = String::new();
   let mut last_dash = true;
   for c in text.chars() {
      if c.is_ascii_alphanumeric() {
         slug.push(c.to_ascii_lowercase());
         last_dash = false;
      } else if !last_dash {
         slug.push('-');
         last_dash = true;
      }
   }
   while slug.ends_with('-') {
      slug.pop();
   }
   slug
}
