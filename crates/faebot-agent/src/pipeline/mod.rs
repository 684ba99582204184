//! Channel-agnostic message pipeline.
//!
//! Pure steps the runtime strings together: recognise commands, decide
//! whether to reply, assemble the prompt, classify the provider outcome and
//! fit it into a chat message.

pub mod commands;
pub mod decide;
pub mod generate;
pub mod prompt;
pub mod truncate;

pub use commands::{dispatch, parse_command, Caller, CommandReply, Effect, Tier};
pub use decide::should_reply;
pub use generate::{Generation, APOLOGY};
pub use prompt::{build_prompt, AssembledPrompt};
pub use truncate::{truncate_for_chat, TRUNCATION_MARKER};
