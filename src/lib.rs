//! # Order Bot
//!
//! A chat bot that collects daily lunch orders. Users post slash-style
//! commands (`orderbot: add: mizu: spicy tuna roll`) to a channel webhook;
//! the bot keeps one order per user per day in a key-value store, asks for
//! confirmation on unknown restaurants and second orders, and lets admins
//! list everything that has been ordered.

pub mod backend;
pub mod bot;
pub mod clock;
pub mod command;
pub mod config;
pub mod dialogue;
pub mod export;
pub mod localization;
pub mod order_store;
pub mod redis_backend;
pub mod restaurants;
pub mod server;
pub mod store_errors;
