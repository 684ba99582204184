pub mod channel;
pub mod error;
pub mod supervisor;
pub mod types;

pub use channel::ChatChannel;
pub use error::ChannelError;
pub use supervisor::{listen_with_backoff, BackoffPolicy};
pub use types::InboundMessage;
