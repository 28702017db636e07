//! Process-wide logging setup
//!
//! Logs go to `~/.codemcp/codemcp.log` and stderr. The level is resolved
//! from `DESKAID_DEBUG` (truthy forces DEBUG), then `DESKAID_DEBUG_LEVEL`,
//! then the user's `~/.codemcprc` `[logger] verbosity`, defaulting to INFO.

use std::{fs, path::PathBuf};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::UserConfig;

fn resolve_level(user_config: &UserConfig) -> String {
   if std::env::var("DESKAID_DEBUG").is_ok_and(|v| !v.is_empty() && v != "0") {
      return "debug".to_string();
   }

   let named = std::env::var("DESKAID_DEBUG_LEVEL")
      .ok()
      .or_else(|| user_config.logger.verbosity.clone())
      .unwrap_or_else(|| "INFO".to_string());

   match named.to_uppercase().as_str() {
      "DEBUG" => "debug",
      "WARNING" | "WARN" => "warn",
      "ERROR" => "error",
      _ => "info",
   }
   .to_string()
}

fn log_dir() -> Option<PathBuf> {
   std::env::var("HOME")
      .or_else(|_| std::env::var("USERPROFILE"))
      .ok()
      .map(|home| PathBuf::from(home).join(".codemcp"))
}

/// Initialise logging once at startup. Safe to call only once.
pub fn init(user_config: &UserConfig) {
   let level = resolve_level(user_config);
   let filter = EnvFilter::new(&level);

   let file_layer = log_dir().and_then(|dir| {
      fs::create_dir_all(&dir).ok()?;
      let file = fs::OpenOptions::new()
         .create(true)
         .append(true)
         .open(dir.join("codemcp.log"))
         .ok()?;
      Some(fmt::layer().with_writer(std::sync::Arc::new(file)).with_ansi(false))
   });

   tracing_subscriber::registry()
      .with(filter)
      .with(file_layer)
      .with(fmt::layer().with_writer(std::io::stderr))
      .init();

   tracing::info!("Logging configured at level {level}");
}

#[cfg(test)]
mod tests {
   use super::*;

   #[test]
   fn test_level_defaults_to_info() {
      let config = UserConfig::default();
      // Environment-dependent levels are exercised end-to-end; here we only
      // pin the fallback.
      if std::env::var("DESKAID_DEBUG").is_err() && std::env::var("DESKAID_DEBUG_LEVEL").is_err() {
         assert_eq!(resolve_level(&config), "info");
      }
   }

   #[test]
   fn test_verbosity_from_user_config() {
      if std::env::var("DESKAID_DEBUG").is_ok() || std::env::var("DESKAID_DEBUG_LEVEL").is_ok() {
         return;
      }
      let config = UserConfig {
         logger: crate::config::LoggerConfig { verbosity: Some("WARNING".to_string()) },
         files:  Default::default(),
      };
      assert_eq!(resolve_level(&config), "warn");
   }
}
