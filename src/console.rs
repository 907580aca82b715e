//! Line-reader command console.
//!
//! Reads lines on its own task, whitespace-splits them into command tokens
//! and hands each non-empty command to a parser callback. The loop ends
//! when the input reaches EOF.

use std::sync::Arc;

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::debug;

pub type CommandParser = Arc<dyn Fn(Vec<String>) + Send + Sync>;

/// Split a raw input line into command tokens, dropping empty fragments.
pub fn split_command(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

/// Spawn the console over stdin.
pub fn spawn(parser: impl Fn(Vec<String>) + Send + Sync + 'static) -> JoinHandle<()> {
    let parser: CommandParser = Arc::new(parser);
    tokio::spawn(async move {
        let reader = BufReader::new(io::stdin());
        run(reader, parser).await;
    })
}

/// Drive the console loop over any buffered reader. Blank lines are skipped.
pub async fn run<R>(reader: R, parser: CommandParser)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let cmd = split_command(&line);
                if cmd.is_empty() {
                    continue;
                }
                parser(cmd);
            }
            Ok(None) => {
                debug!("console input closed");
                return;
            }
            Err(err) => {
                debug!(error = %err, "console read failed");
                return;
            }
        }
    }
}
