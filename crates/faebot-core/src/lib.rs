pub mod config;
pub mod error;
pub mod types;

pub use config::FaebotConfig;
pub use error::{FaebotError, Result};
pub use types::{ChannelName, SamplingParams};
