//! Out-of-band verification code delivery
//!
//! SMS and email challenges need a human to relay the code. The capability
//! may block for as long as that takes; tests inject canned codes instead
//! of touching a terminal.

use async_trait::async_trait;
use rp_types::{AppError, AppResult};
use std::io::Write;

#[async_trait]
pub trait CodeProvider: Send + Sync {
    /// Ask the operator for a verification code. Blocks until one arrives.
    async fn prompt_for_code(&self, prompt: &str) -> AppResult<String>;
}

/// Reads codes from standard input.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinCodeProvider;

#[async_trait]
impl CodeProvider for StdinCodeProvider {
    async fn prompt_for_code(&self, prompt: &str) -> AppResult<String> {
        let prompt = prompt.to_string();

        // Terminal reads block the thread, so they run off the runtime.
        let code = tokio::task::spawn_blocking(move || -> AppResult<String> {
            let mut stdout = std::io::stdout();
            writeln!(stdout, "{}", prompt)?;
            stdout.flush()?;

            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            Ok(line.trim().to_string())
        })
        .await
        .map_err(|e| AppError::Io(std::io::Error::other(e)))??;

        if code.is_empty() {
            return Err(AppError::Io(std::io::Error::other(
                "empty verification code",
            )));
        }
        Ok(code)
    }
}
