use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodeMcpError {
   #[error("File path must be absolute, not relative: {0}")]
   PathInvalid(String),

   #[error("{0}")]
   PermissionDenied(String),

   #[error("Path {path} is not within the git repository at {repo_root}")]
   OutsideRepository { path: String, repo_root: String },

   #[error(
      "File is not tracked by git. Please add the file to git tracking first using 'git add <file>'"
   )]
   NotTracked,

   #[error("{0}")]
   NotFound(String),

   #[error("Path is a directory, not a file: {0}")]
   IsADirectory(String),

   #[error("Path is not a directory: {0}")]
   NotADirectory(String),

   #[error(
      "File has been modified since read, either by the user or by a linter. Read it again before attempting to write it."
   )]
   StaleRead,

   #[error(
      "Found {count} matches of the string to replace. For safety, this tool only supports replacing exactly one occurrence at a time. Add more lines of context to your edit and try again."
   )]
   AmbiguousMatch { count: usize },

   #[error("String to replace not found in file.")]
   NoMatch,

   #[error("{name} command failed with exit code {code}:\n{stdout}\n{stderr}")]
   CommandFailed {
      name:   String,
      code:   i32,
      stdout: String,
      stderr: String,
   },

   #[error("Git command failed: {0}")]
   Git(String),

   #[error("{0}")]
   Config(String),

   #[error("IO error: {0}")]
   Io(#[from] std::io::Error),

   #[error("JSON error: {0}")]
   Json(#[from] serde_json::Error),

   #[error("{0}")]
   Other(String),
}

pub type Result<T> = std::result::Result<T, CodeMcpError>;
