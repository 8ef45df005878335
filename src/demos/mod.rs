//! Demo applications
//!
//! Two small programs built purely on the dispatch API: [`title`] rewrites the
//! page title of every visitor, [`chat`] is a one-room chat driven entirely by
//! server-sent scripts.

pub mod chat;
pub mod title;

pub use chat::chat_demo;
pub use title::title_demo;
