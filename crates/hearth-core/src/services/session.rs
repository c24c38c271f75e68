use async_trait::async_trait;
use tracing::debug;

use crate::error::ServiceResult;

/// Outbound side of the transport layer.
///
/// The transport itself lives outside the host; plugins only ever see this
/// handle.
#[async_trait]
pub trait Session: Send + Sync {
    /// Identifier of the connected account (used in logs).
    fn id(&self) -> &str;

    /// Sends a text message to `channel`.
    async fn send(&self, channel: &str, content: &str) -> ServiceResult<()>;
}

/// Session that drops every outbound message.
///
/// Used when no transport is attached, e.g. in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSession;

#[async_trait]
impl Session for NullSession {
    fn id(&self) -> &str {
        "null"
    }

    async fn send(&self, channel: &str, content: &str) -> ServiceResult<()> {
        debug!(channel, content, "Dropping outbound message (no session attached)");
        Ok(())
    }
}
