//! Terminal front-end.

pub mod chat;
