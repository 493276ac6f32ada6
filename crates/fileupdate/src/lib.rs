//! fileupdate: storage layer and admin tooling for the release service.
//!
//! [`storage::Storage`] is the single entry point to persisted state. It is
//! built once from [`config::Config`] and handed to every consumer.

pub mod artifacts;
pub mod cli;
pub mod config;
pub mod storage;
