//! Domain model for bookmarked conversations and backups.
//!
//! # Responsibility
//! - Define the record shape owned by the collection store.
//! - Define the portable backup document exchanged with the outside world.
//!
//! # Invariants
//! - A record's fingerprint is always derived from `title + body`, never
//!   stored.
//! - Records with empty title and empty body are ghosts and never surface.

pub mod backup;
pub mod conversation;
