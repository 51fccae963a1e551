//! Well-known role name constants.
//!
//! Roles arrive in the `role` claim of tokens minted by the identity
//! provider; these are the names the authorization gate understands.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_HR: &str = "hr";
pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_SCHOOL: &str = "school";
pub const ROLE_COACHING: &str = "coaching";
pub const ROLE_USER: &str = "user";

/// Roles that may review applicants in addition to admins and vacancy owners.
pub const APPLICANT_REVIEWER_ROLES: &[&str] = &[ROLE_HR];
