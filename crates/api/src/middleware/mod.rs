//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated caller from a JWT Bearer token.
//! - [`auth::MaybeAuthUser`] -- Same, but anonymous requests are allowed.
//! - [`rbac::RequireAdmin`] -- Requires the `admin` role.

pub mod auth;
pub mod rbac;
