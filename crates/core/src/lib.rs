//! Core of the fileupdate release service.
//!
//! Records (apps, tokens, releases), the storage contract every backend
//! implements, and the pure logic around them. Nothing in this crate does I/O.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod storage;
