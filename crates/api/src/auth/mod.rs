//! Authentication primitives.
//!
//! - [`jwt`] -- verification of HS256 session tokens minted by the identity provider.

pub mod jwt;
