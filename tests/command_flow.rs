//! End-to-end tests for the commutable auto-commit command runner.

mod common;

use std::os::unix::fs::PermissionsExt;

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
         "user_prompt": "Command flow test",
         "subject_line": "test: command flow",
         "reuse_head_chat_id": false,
      }),
   );
   assert!(!result.starts_with("Error:"), "InitProject failed: {result}");
   chat_id_from(&result)
}

/// Install an executable script and register it as the `format` command.
fn install_format_command(repo: &TestRepo, script_body: &str) {
   let script = repo.path().join("run_format.sh");
   std::fs::write(&script, format!("#!/bin/sh\n{script_body}\n")).unwrap();
   std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

   std::fs::write(
      repo.path().join("codemcp.toml"),
      "[project]\nname = \"test-project\"\n\n[commands]\nformat = [\"./run_format.sh\"]\n",
   )
   .unwrap();
   repo.git(&["add", "codemcp.toml", "run_format.sh"]);
   repo.git(&["commit", "-q", "-m", "Configure format command"]);
}

const PY_FILE: &str = "line01\nline02\nline03\nline04\nline05\nline06\nline07\nline08\nline09\nline10\nline11\nline12\n";

#[test]
fn commutable_format_succeeds() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   repo.commit_file("a.py", PY_FILE, "Add a.py");
   install_format_command(&repo, "printf '# formatted\\n' >> a.py\necho formatted a.py");
   let chat_id = init_session(&tools, &repo);

   // Uncommitted user edit in the middle of the file.
   let edited = PY_FILE.replace("line03", "line03 # user change");
   std::fs::write(repo.path().join("a.py"), &edited).unwrap();

   let head_before = repo.head_hash();
   let result = call(
      &tools,
      json!({
         "subtool": "RunCommand",
         "path": repo.path_str(),
         "command": "format",
         "chat_id": chat_id,
      }),
   );

   assert!(result.contains("changes commuted successfully"), "unexpected: {result}");
   assert!(result.contains("formatted a.py"));

   // The user's semantic change is still uncommitted.
   assert!(repo.status().contains("M a.py"), "status: {}", repo.status());

   // HEAD is a new commit recording only the formatter's change.
   assert_ne!(repo.head_hash(), head_before);
   let head_diff = repo.git(&["diff", "HEAD^", "HEAD", "--", "a.py"]);
   assert!(head_diff.contains("+# formatted"));
   assert!(!head_diff.contains("user change"));

   // The working tree holds both.
   let content = std::fs::read_to_string(repo.path().join("a.py")).unwrap();
   assert!(content.contains("line03 # user change"));
   assert!(content.contains("# formatted"));
}

#[test]
fn non_commuting_changes_keep_original_order() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   repo.commit_file("a.py", PY_FILE, "Add a.py");
   // The formatter rewrites the very line the user edited.
   install_format_command(&repo, "sed -i 's/^line03.*/line03-formatted/' a.py");
   let chat_id = init_session(&tools, &repo);

   let edited = PY_FILE.replace("line03", "line03 # user change");
   std::fs::write(repo.path().join("a.py"), &edited).unwrap();

   let result = call(
      &tools,
      json!({
         "subtool": "RunCommand",
         "path": repo.path_str(),
         "command": "format",
         "chat_id": chat_id,
      }),
   );

   assert!(
      result.contains("changes don't commute, using original order"),
      "unexpected: {result}"
   );

   // Both the snapshot and the command's effect are committed, in causal
   // order, and the tree is clean.
   assert_eq!(repo.status(), "");
   let head_message = repo.head_message();
   assert!(head_message.starts_with("POST_COMMIT:"), "message: {head_message}");
   let parent_message = repo.git(&["log", "-1", "--pretty=%B", "HEAD^"]);
   assert!(parent_message.starts_with("PRE_COMMIT:"), "message: {parent_message}");

   let content = std::fs::read_to_string(repo.path().join("a.py")).unwrap();
   assert!(content.contains("line03-formatted"));
}

#[test]
fn failing_command_restores_state() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   repo.commit_file("a.py", PY_FILE, "Add a.py");
   install_format_command(&repo, "echo boom >&2\nexit 3");
   let chat_id = init_session(&tools, &repo);

   let edited = PY_FILE.replace("line03", "line03 # user change");
   std::fs::write(repo.path().join("a.py"), &edited).unwrap();

   let head_before = repo.head_hash();
   let status_before = repo.status();
   let diff_before = repo.git(&["diff"]);

   let result = call(
      &tools,
      json!({
         "subtool": "RunCommand",
         "path": repo.path_str(),
         "command": "format",
         "chat_id": chat_id,
      }),
   );

   assert!(result.starts_with("Error:"), "unexpected: {result}");
   assert!(result.contains("exit code 3"), "unexpected: {result}");
   assert!(result.contains("boom"), "unexpected: {result}");

   // HEAD and the working-tree diff are exactly as before the call.
   assert_eq!(repo.head_hash(), head_before);
   assert_eq!(repo.status(), status_before);
   assert_eq!(repo.git(&["diff"]), diff_before);
}

#[test]
fn command_with_no_effect_reports_no_changes() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   repo.commit_file("a.py", PY_FILE, "Add a.py");
   install_format_command(&repo, "echo nothing to do");
   let chat_id = init_session(&tools, &repo);

   let edited = PY_FILE.replace("line03", "line03 # user change");
   std::fs::write(repo.path().join("a.py"), &edited).unwrap();

   let head_before = repo.head_hash();
   let result = call(
      &tools,
      json!({
         "subtool": "RunCommand",
         "path": repo.path_str(),
         "command": "format",
         "chat_id": chat_id,
      }),
   );

   assert!(result.contains("no changes made"), "unexpected: {result}");
   assert_eq!(repo.head_hash(), head_before);
   assert!(repo.status().contains("M a.py"));
}

#[test]
fn clean_tree_command_changes_are_committed() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   repo.commit_file("a.py", PY_FILE, "Add a.py");
   install_format_command(&repo, "printf '# formatted\\n' >> a.py");
   let chat_id = init_session(&tools, &repo);

   let result = call(
      &tools,
      json!({
         "subtool": "RunCommand",
         "path": repo.path_str(),
         "command": "format",
         "chat_id": chat_id,
      }),
   );

   assert!(result.contains("successful and changes committed"), "unexpected: {result}");
   assert_eq!(repo.status(), "");
   let content = std::fs::read_to_string(repo.path().join("a.py")).unwrap();
   assert!(content.contains("# formatted"));
}

#[test]
fn unconfigured_command_is_an_error() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   let chat_id = init_session(&tools, &repo);

   let result = call(
      &tools,
      json!({
         "subtool": "RunCommand",
         "path": repo.path_str(),
         "command": "lint",
         "chat_id": chat_id,
      }),
   );

   assert!(result.starts_with("Error:"), "unexpected: {result}");
   assert!(result.contains("No lint command configured in codemcp.toml"));
}

#[test]
fn arguments_are_tokenized_and_passed_through() {
   let repo = TestRepo::init();
   let tools = Tools::new();
   repo.commit_file("a.py", PY_FILE, "Add a.py");
   install_format_command(&repo, "echo \"args: $@\"");
   let chat_id = init_session(&tools, &repo);

   let result = call(
      &tools,
      json!({
         "subtool": "RunCommand",
         "path": repo.path_str(),
         "command": "format",
         "arguments": "--check 'two words'",
         "chat_id": chat_id,
      }),
   );

   assert!(result.contains("args: --check two words"), "unexpected: {result}");
}
