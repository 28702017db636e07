use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;

use codemcp::{ToolCall, Tools, UserConfig};

/// Git-transactional code-editing backend.
///
/// Reads one JSON tool call per line on stdin and writes one JSON result
/// per line on stdout. The transport framing a host wraps around this is
/// its own concern; this loop exists for local driving and debugging.
#[derive(Parser, Debug)]
#[command(name = "codemcp", version, about)]
struct Args {
   /// Working directory to run in
   #[arg(long)]
   dir: Option<String>,
}

fn main() -> Result<()> {
   let args = Args::parse();

   let user_config = UserConfig::load();
   codemcp::logging::init(&user_config);

   if let Some(dir) = &args.dir {
      std::env::set_current_dir(dir).with_context(|| format!("Failed to enter {dir}"))?;
   }

   let tools = Tools::new();
   let stdin = std::io::stdin();
   let mut stdout = std::io::stdout().lock();

   for line in stdin.lock().lines() {
      let line = line.context("Failed to read request")?;
      if line.trim().is_empty() {
         continue;
      }

      let result = match serde_json::from_str::<serde_json::Value>(&line)
         .map_err(|e| e.to_string())
         .and_then(ToolCall::from_value)
      {
         Ok(call) => tools.dispatch(call),
         Err(e) => format!("Error: {e}"),
      };

      let response = serde_json::json!({ "result": result });
      writeln!(stdout, "{response}")?;
      stdout.flush()?;
   }

   Ok(())
}
