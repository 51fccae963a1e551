//! HTTP request handlers.
//!
//! [`collection`] holds the generic handlers shared by every entity; the
//! other modules cover endpoints with entity-specific rules.

pub mod admin;
pub mod application;
pub mod collection;
pub mod vacancy;
