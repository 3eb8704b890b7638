//! Application services layer.

pub mod chat;
pub mod comments;
pub mod error;
pub mod posts;
pub mod repos;
