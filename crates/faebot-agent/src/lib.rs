pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod replicate;
pub mod roster;
pub mod runtime;
pub mod sampling;
pub mod state;

pub use provider::{GenerationProvider, GenerationRequest, ProviderError};
pub use registry::ConversationRegistry;
pub use replicate::ReplicateProvider;
pub use roster::ModelRoster;
pub use runtime::Bot;
pub use state::{ChannelDefaults, ChannelState};
