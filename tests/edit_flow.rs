//! End-to-end tests for EditFile / WriteFile behaviors.

mod common;

use codemcp::{ToolCall, Tools};
use common::{TestRepo, chat_id_from};
use serde_json::json;

fn call(tools: &Tools, value: serde_json::Value) -> String {
   let call = ToolCall::from_value(value).expect("valid tool call");
   tools.dispatch(call)
}

fn init_session(tools: &Tools, repo: &TestRepo) -> String {
   let result = call(
      tools,
      json!({
         "subtool": "InitProject",
         "path": repo.path_str(),
         "user_prompt": "Edit flow test",
         "subject_line": "test: edit flow",
         "reuse_head_chat_id": false,
      }),
   );
   assert!(!result.starts_with("Error:"), "InitProject failed: {result}");
   chat_id_from(&result)
}

#[test]
fn create_file_in_new_directory() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);

   let nested = repo.path().join("deeply/nested/dir/new_file.txt");
   let result = call(
      &tools,
      json!({
         "subtool": "EditFile",
         "path": nested.to_str().unwrap(),
         "old_string": "",
         "new_string": "created content\n",
         "description": "Create nested file",
         "chat_id": chat_id,
      }),
   );

   assert!(result.contains("Successfully created"), "unexpected: {result}");
   assert_eq!(std::fs::read_to_string(&nested).unwrap(), "created content\n");

   // The new file is tracked immediately.
   let tracked = repo.git(&["ls-files", "deeply/nested/dir/new_file.txt"]);
   assert!(!tracked.is_empty());
}

#[test]
fn create_refused_when_file_exists() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);
   repo.commit_file("existing.txt", "old\n", "Add existing");

   let path = repo.path().join("existing.txt");
   let result = call(
      &tools,
      json!({
         "subtool": "EditFile",
         "path": path.to_str().unwrap(),
         "old_string": "",
         "new_string": "replacement\n",
         "description": "Overwrite",
         "chat_id": chat_id,
      }),
   );

   assert!(result.starts_with("Error:"), "unexpected: {result}");
   assert!(result.contains("file already exists"));
}

#[test]
fn identical_strings_are_a_noop() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);
   repo.commit_file("same.txt", "content\n", "Add same");

   let path = repo.path().join("same.txt");
   let result = call(
      &tools,
      json!({
         "subtool": "EditFile",
         "path": path.to_str().unwrap(),
         "old_string": "content",
         "new_string": "content",
         "description": "No-op",
         "chat_id": chat_id,
      }),
   );

   assert!(result.contains("No changes to make"), "unexpected: {result}");
}

#[test]
fn stale_edit_is_refused_until_reread() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);
   repo.commit_file("watched.txt", "original\n", "Add watched");

   let path = repo.path().join("watched.txt");
   call(&tools, json!({ "subtool": "ReadFile", "path": path.to_str().unwrap() }));

   // An external editor touches the file after our read.
   let future = std::time::SystemTime::now() + std::time::Duration::from_secs(10);
   let file = std::fs::File::options().write(true).open(&path).unwrap();
   file.set_modified(future).unwrap();
   drop(file);

   let result = call(
      &tools,
      json!({
         "subtool": "EditFile",
         "path": path.to_str().unwrap(),
         "old_string": "original",
         "new_string": "changed",
         "description": "Edit watched",
         "chat_id": chat_id,
      }),
   );
   assert!(result.starts_with("Error:"), "unexpected: {result}");
   assert!(result.contains("modified since read"), "unexpected: {result}");

   // Re-reading clears the staleness.
   call(&tools, json!({ "subtool": "ReadFile", "path": path.to_str().unwrap() }));
   let result = call(
      &tools,
      json!({
         "subtool": "EditFile",
         "path": path.to_str().unwrap(),
         "old_string": "original",
         "new_string": "changed",
         "description": "Edit watched",
         "chat_id": chat_id,
      }),
   );
   assert!(result.contains("Successfully edited"), "unexpected: {result}");
}

#[test]
fn crlf_line_endings_preserved() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);
   repo.commit_file("dos.txt", "alpha\r\nbeta\r\n", "Add dos file");

   let path = repo.path().join("dos.txt");
   call(&tools, json!({ "subtool": "ReadFile", "path": path.to_str().unwrap() }));
   let result = call(
      &tools,
      json!({
         "subtool": "EditFile",
         "path": path.to_str().unwrap(),
         "old_string": "alpha",
         "new_string": "ALPHA",
         "description": "Uppercase alpha",
         "chat_id": chat_id,
      }),
   );
   assert!(result.contains("Successfully edited"), "unexpected: {result}");

   let bytes = std::fs::read(&path).unwrap();
   assert_eq!(bytes, b"ALPHA\r\nbeta\r\n");
}

#[test]
fn trailing_whitespace_stripped_on_write() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);

   let path = repo.path().join("clean.txt");
   let result = call(
      &tools,
      json!({
         "subtool": "WriteFile",
         "path": path.to_str().unwrap(),
         "content": "line one   \nline two\t\nno newline at end",
         "description": "Create clean",
         "chat_id": chat_id,
      }),
   );
   assert!(result.contains("Successfully wrote to"), "unexpected: {result}");
   assert_eq!(std::fs::read_to_string(&path).unwrap(), "line one\nline two\nno newline at end\n");
}

#[test]
fn editing_config_file_is_refused() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);

   let path = repo.path().join("codemcp.toml");
   let result = call(
      &tools,
      json!({
         "subtool": "WriteFile",
         "path": path.to_str().unwrap(),
         "content": "[project]\n",
         "description": "Tamper with config",
         "chat_id": chat_id,
      }),
   );
   assert!(result.starts_with("Error:"), "unexpected: {result}");
   assert!(result.contains("not allowed"), "unexpected: {result}");
}

#[test]
fn missing_file_suggests_sibling() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);
   repo.commit_file("widget.tsx", "component\n", "Add widget");

   let path = repo.path().join("widget.ts");
   let result = call(
      &tools,
      json!({
         "subtool": "EditFile",
         "path": path.to_str().unwrap(),
         "old_string": "component",
         "new_string": "module",
         "description": "Edit widget",
         "chat_id": chat_id,
      }),
   );
   assert!(result.starts_with("Error:"), "unexpected: {result}");
   assert!(result.contains("Did you mean"), "unexpected: {result}");
   assert!(result.contains("widget.tsx"));
}

#[test]
fn mv_and_rm_commit_their_changes() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);
   repo.commit_file("old_name.txt", "payload\n", "Add old_name");
   let base_count = repo.commit_count();

   let result = call(
      &tools,
      json!({
         "subtool": "MV",
         "source_path": repo.path().join("old_name.txt").to_str().unwrap(),
         "target_path": repo.path().join("new_name.txt").to_str().unwrap(),
         "description": "Rename for clarity",
         "chat_id": chat_id,
      }),
   );
   assert!(result.contains("Successfully moved file"), "unexpected: {result}");
   assert!(!repo.path().join("old_name.txt").exists());
   assert!(repo.path().join("new_name.txt").exists());
   assert_eq!(repo.commit_count(), base_count + 1);

   let result = call(
      &tools,
      json!({
         "subtool": "RM",
         "path": repo.path().join("new_name.txt").to_str().unwrap(),
         "description": "No longer needed",
         "chat_id": chat_id,
      }),
   );
   assert!(result.contains("Successfully removed file"), "unexpected: {result}");
   assert!(!repo.path().join("new_name.txt").exists());
   // Same session: the removal amended the session commit.
   assert_eq!(repo.commit_count(), base_count + 1);
}

#[test]
fn chmod_toggles_and_commits() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);
   repo.commit_file("script.sh", "#!/bin/sh\necho hi\n", "Add script");

   let path = repo.path().join("script.sh");
   let result = call(
      &tools,
      json!({
         "subtool": "Chmod",
         "path": path.to_str().unwrap(),
         "mode": "a+x",
         "chat_id": chat_id,
      }),
   );
   assert!(result.contains("executable"), "unexpected: {result}");

   use std::os::unix::fs::PermissionsExt;
   let mode = std::fs::metadata(&path).unwrap().permissions().mode();
   assert_ne!(mode & 0o111, 0);

   // Second application is a friendly no-op.
   let result = call(
      &tools,
      json!({
         "subtool": "Chmod",
         "path": path.to_str().unwrap(),
         "mode": "a+x",
         "chat_id": chat_id,
      }),
   );
   assert!(result.contains("already executable"), "unexpected: {result}");
}

#[test]
fn ls_and_grep_report_repository_contents() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);
   repo.commit_file("needle_here.txt", "the needle is here\n", "Add needle");
   repo.commit_file("hay.txt", "just hay\n", "Add hay");

   let result = call(
      &tools,
      json!({ "subtool": "LS", "path": repo.path_str(), "chat_id": chat_id }),
   );
   assert!(result.contains("- needle_here.txt"), "unexpected: {result}");
   assert!(result.contains("- hay.txt"));

   let result = call(
      &tools,
      json!({
         "subtool": "Grep",
         "pattern": "needle",
         "path": repo.path_str(),
         "chat_id": chat_id,
      }),
   );
   assert!(result.contains("Found 1 file"), "unexpected: {result}");
   assert!(result.contains("needle_here.txt"));

   let result = call(
      &tools,
      json!({
         "subtool": "Grep",
         "pattern": "nothing_matches_this",
         "path": repo.path_str(),
         "chat_id": chat_id,
      }),
   );
   assert_eq!(result, "No files found");
}

#[test]
fn git_log_passthrough() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);

   let result = call(
      &tools,
      json!({
         "subtool": "GitLog",
         "arguments": "--oneline -n 1",
         "path": repo.path_str(),
         "chat_id": chat_id,
      }),
   );
   assert!(result.contains("Initial commit"), "unexpected: {result}");
}
