//! Domain logic for the eduboard job board.
//!
//! This crate performs no I/O. Everything here is shared by the storage
//! layer, the notification dispatcher and the HTTP API.

pub mod authz;
pub mod batching;
pub mod error;
pub mod filter;
pub mod pagination;
pub mod roles;
pub mod short_id;
pub mod slug;
pub mod types;
pub mod validation;
