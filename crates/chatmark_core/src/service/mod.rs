//! Collection use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into save/list/categorize/backup APIs.
//! - Turn store read failures into logged, empty fallbacks on read paths.

pub mod backup_service;
pub mod collection_service;
