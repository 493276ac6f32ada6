//! JSON file storage backend.
//!
//! Each collection is a pretty-printed JSON array in its own file. Every
//! operation reads the whole file and every mutation rewrites it; there is
//! no locking, so concurrent writers can lose updates.

mod repository;

pub use repository::JsonRepository;
