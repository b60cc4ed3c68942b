//! Data models for chat room entities

mod event;
mod message;
mod presence;

pub use event::*;
pub use message::*;
pub use presence::*;
