use crate::error::WatchError;
use crate::models::OutboundMessage;
use async_trait::async_trait;

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), WatchError>;
}

/// Prints messages instead of sending them. Used by `watcher --dry-run`.
#[derive(Debug, Default)]
pub struct StdoutChannel;

#[async_trait]
impl DeliveryChannel for StdoutChannel {
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), WatchError> {
        println!("{}", message.text);
        if let Some(path) = &message.attachment_path {
            println!("[attachment: {}]", path.display());
        }
        println!();
        Ok(())
    }
}
