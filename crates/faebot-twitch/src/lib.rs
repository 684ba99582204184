//! `faebot-twitch`: Twitch chat transport.
//!
//! Speaks IRC over TLS to Twitch's chat servers and exposes the connection as
//! a [`faebot_channels::ChatChannel`].

pub mod adapter;
pub mod irc;
pub mod send;

pub use adapter::TwitchChannel;
