//! Bot module: turns an incoming chat message into a reply
//!
//! This module is split into several submodules:
//! - `dispatcher`: the `OrderBot` and its per-user state machine
//! - `handlers`: one handler per command plus confirmation resolution
//! - `formatter`: wraps reply text in the chat payload envelope
//! - `user_locks`: serialises concurrent requests from the same user

pub mod dispatcher;
pub mod formatter;
pub mod handlers;
pub mod user_locks;

pub use dispatcher::OrderBot;
pub use formatter::{format_reply, ChatPayload};
pub use user_locks::UserLocks;
