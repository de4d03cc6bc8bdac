//! In-memory adapters that live inside the domain crate.
//!
//! State exists only for the lifetime of the process; the stores are
//! constructed once at startup and shared by handle.

pub mod memory_repo;
