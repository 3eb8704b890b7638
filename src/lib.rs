//! Brezza: a blog platform API built around a shared key-value cache layer.
//!
//! The crate is split into a domain layer (entities and reaction rules), an
//! application layer (services wired through repository traits), the cache
//! subsystem (store, response cache, rate limiters, chat cache), and the
//! infrastructure layer (HTTP surface, in-memory repositories, telemetry).

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
