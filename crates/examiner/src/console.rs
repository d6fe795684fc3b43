//! Console interaction adapter.
//!
//! Blue for the examiner, green for the student prompt. Collecting an
//! answer blocks on stdin inside `spawn_blocking` so the async session
//! loop itself never blocks a worker thread.

use std::io::{BufRead, Write};

use async_trait::async_trait;

use examination::{AdapterError, InteractionPort};

pub struct ConsoleIo;

impl ConsoleIo {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleIo {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InteractionPort for ConsoleIo {
    async fn present(&self, text: &str) -> Result<(), AdapterError> {
        println!("\n\x1b[1;34m[Examiner]: {text}\x1b[0m");
        Ok(())
    }

    async fn collect_answer(&self) -> Result<String, AdapterError> {
        let answer = tokio::task::spawn_blocking(|| -> Result<String, AdapterError> {
            let mut stdout = std::io::stdout();
            write!(stdout, "\n\x1b[1;32m[Student]: \x1b[0m")
                .and_then(|_| stdout.flush())
                .map_err(|e| AdapterError::Disconnected(format!("stdout: {e}")))?;

            let mut line = String::new();
            let read = std::io::stdin()
                .lock()
                .read_line(&mut line)
                .map_err(|e| AdapterError::Disconnected(format!("stdin: {e}")))?;
            if read == 0 {
                return Err(AdapterError::Disconnected("stdin closed".into()));
            }
            Ok(line.trim().to_string())
        })
        .await
        .map_err(|e| AdapterError::Disconnected(format!("input task failed: {e}")))??;

        Ok(answer)
    }
}
