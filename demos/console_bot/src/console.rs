//! Terminal transport: stdin lines in, stdout lines out.

use std::sync::Arc;

use hearth::prelude::*;
use hearth::core::{ServiceResult, Session};
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// Channel every console message arrives on.
pub const CHANNEL: &str = "console";

/// Outbound side: prints bot messages.
#[derive(Debug, Clone)]
pub struct ConsoleSession {
    id: String,
}

impl ConsoleSession {
    pub fn new(user: impl Into<String>) -> Self {
        Self { id: user.into() }
    }
}

#[async_trait]
impl Session for ConsoleSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn send(&self, channel: &str, content: &str) -> ServiceResult<()> {
        println!("[{channel}] bot: {content}");
        Ok(())
    }
}

/// Inbound side: turns each stdin line into a `message_received` event.
///
/// Lines are dispatched one at a time so replies stay in order. End of input
/// shuts the host down.
pub async fn read_stdin(runtime: Arc<HearthRuntime>, author: String) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read from stdin");
                break;
            }
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let mut kwargs = Kwargs::new();
        kwargs.insert("channel".into(), json!(CHANNEL));
        kwargs.insert("author".into(), json!(author));
        match runtime
            .inbound("message_received", vec![json!(text)], kwargs)
            .await
        {
            Ok(outcome) => debug!(?outcome, "Message dispatched"),
            Err(e) => warn!(error = %e, "Dispatch task failed"),
        }
        if runtime.host().shutdown_signal().is_begun() {
            return;
        }
    }
    debug!("Input closed");
    runtime.host().shutdown().await;
}
