//! Shared test fixture: a real git repository in a temp directory with a
//! pinned identity, an initial commit, and a codemcp.toml.

use std::{path::Path, process::Command};

use tempfile::TempDir;

pub struct TestRepo {
   pub dir: TempDir,
}

impl TestRepo {
   pub fn init() -> Self {
      let dir = TempDir::new().expect("create temp dir");
      let repo = Self { dir };

      repo.git(&["init", "-q", "-b", "main"]);
      repo.git(&["config", "user.email", "committer@example.com"]);
      repo.git(&["config", "user.name", "C O Mitter"]);
      repo.git(&["config", "commit.gpgsign", "false"]);

      std::fs::write(repo.path().join("README.md"), "# Test Repository\n").unwrap();
      std::fs::write(repo.path().join("codemcp.toml"), "[project]\nname = \"test-project\"\n")
         .unwrap();
      repo.git(&["add", "README.md", "codemcp.toml"]);
      repo.git(&["commit", "-q", "-m", "Initial commit"]);

      repo
   }

   pub fn path(&self) -> &Path {
      self.dir.path()
   }

   pub fn path_str(&self) -> &str {
      self.path().to_str().unwrap()
   }

   /// Run git in the repo, asserting success, returning trimmed stdout.
   pub fn git(&self, args: &[&str]) -> String {
      let output = Command::new("git")
         .args(args)
         .current_dir(self.path())
         .output()
         .expect("run git");
      assert!(
         output.status.success(),
         "git {args:?} failed: {}",
         String::from_utf8_lossy(&output.stderr)
      );
      String::from_utf8_lossy(&output.stdout).trim().to_string()
   }

   pub fn commit_count(&self) -> usize {
      self.git(&["rev-list", "--count", "HEAD"]).parse().unwrap()
   }

   pub fn head_message(&self) -> String {
      self.git(&["log", "-1", "--pretty=%B"])
   }

   pub fn head_hash(&self) -> String {
      self.git(&["rev-parse", "HEAD"])
   }

   pub fn status(&self) -> String {
      self.git(&["status", "--porcelain"])
   }

   /// Write a file, `git add` it, and commit it directly (outside the
   /// backend), so tests can set up tracked content.
   pub fn commit_file(&self, name: &str, content: &str, message: &str) {
      std::fs::write(self.path().join(name), content).unwrap();
      self.git(&["add", name]);
      self.git(&["commit", "-q", "-m", message]);
   }
}

/// Extract the assigned chat ID out of an InitProject result.
pub fn chat_id_from(init_result: &str) -> String {
   init_result
      .split("unique ID: ")
      .nth(1)
      .expect("init result carries a chat ID")
      .lines()
      .next()
      .unwrap()
      .trim()
      .to_string()
}
