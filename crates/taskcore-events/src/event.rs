use async_trait::async_trait;
use taskcore_types::PushEvent;

/// A handler registered against one or more event types (§4.D).
///
/// Returning `Err` does not stop sibling handlers from running; the
/// controller logs and swallows it.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: &PushEvent) -> anyhow::Result<()>;
}
