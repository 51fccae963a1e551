//! Authorization gate.
//!
//! Handlers receive the verified claims of the caller as a [`Principal`] and
//! call [`authorize`] with the [`Access`] rule of the operation. A missing
//! principal is always `Unauthorized` (401); a present principal that fails
//! the rule is `Forbidden` (403).

use crate::error::CoreError;
use crate::roles::ROLE_ADMIN;

/// Verified identity of the caller, taken from the session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Stable user id issued by the identity provider (`sub` claim).
    pub user_id: String,
    /// Role name (`role` claim).
    pub role: String,
    /// Email address (`email` claim), when the provider supplies one.
    pub email: Option<String>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|role| self.role == *role)
    }

    /// Whether this principal owns a record, by stored owner id or by email.
    pub fn owns(&self, owner: &Ownership<'_>) -> bool {
        let by_id = owner.owner_id.is_some_and(|id| id == self.user_id);
        let by_email = match (owner.owner_email, self.email.as_deref()) {
            (Some(stored), Some(mine)) => stored.eq_ignore_ascii_case(mine),
            _ => false,
        };
        by_id || by_email
    }
}

/// The owner markers stored on a record.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ownership<'a> {
    pub owner_id: Option<&'a str>,
    pub owner_email: Option<&'a str>,
}

/// Access rule for one operation. Admins satisfy every rule.
#[derive(Debug, Clone, Copy)]
pub enum Access<'a> {
    /// Any authenticated caller.
    Authenticated,
    /// Admin only.
    Admin,
    /// The record's owner, or an admin.
    OwnerOrAdmin(Ownership<'a>),
    /// One of the listed roles, or an admin.
    AnyRole(&'a [&'a str]),
    /// The record's owner, one of the listed roles, or an admin.
    OwnerOrRoles(Ownership<'a>, &'a [&'a str]),
}

impl Access<'_> {
    /// Whether `principal` satisfies this rule.
    pub fn permits(&self, principal: &Principal) -> bool {
        if principal.is_admin() {
            return true;
        }
        match self {
            Access::Authenticated => true,
            Access::Admin => false,
            Access::OwnerOrAdmin(owner) => principal.owns(owner),
            Access::AnyRole(roles) => principal.has_any_role(roles),
            Access::OwnerOrRoles(owner, roles) => {
                principal.owns(owner) || principal.has_any_role(roles)
            }
        }
    }

    fn denial(&self) -> &'static str {
        match self {
            Access::Authenticated => "Authentication required",
            Access::Admin => "Admin role required",
            Access::OwnerOrAdmin(_) => "Only the owner or an admin may do this",
            Access::AnyRole(_) => "Your role does not permit this",
            Access::OwnerOrRoles(_, _) => "Only the owner or a permitted role may do this",
        }
    }
}

/// Check `access` for an optional caller.
///
/// Returns the principal on success so callers can keep using it.
pub fn authorize<'p>(
    principal: Option<&'p Principal>,
    access: Access<'_>,
) -> Result<&'p Principal, CoreError> {
    let principal =
        principal.ok_or_else(|| CoreError::Unauthorized("Authentication required".into()))?;
    if access.permits(principal) {
        Ok(principal)
    } else {
        Err(CoreError::Forbidden(access.denial().into()))
    }
}

/// Whether a caller may see private fields of a record.
pub fn can_view_private(principal: Option<&Principal>, owner: &Ownership<'_>) -> bool {
    principal.is_some_and(|p| Access::OwnerOrAdmin(*owner).permits(p))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::roles::{ROLE_HR, ROLE_TEACHER};

    fn principal(user_id: &str, role: &str, email: Option<&str>) -> Principal {
        Principal {
            user_id: user_id.into(),
            role: role.into(),
            email: email.map(Into::into),
        }
    }

    const OWNED: Ownership<'static> = Ownership {
        owner_id: Some("u-1"),
        owner_email: Some("owner@example.com"),
    };

    #[test]
    fn missing_principal_is_unauthorized() {
        assert_matches!(
            authorize(None, Access::Authenticated),
            Err(CoreError::Unauthorized(_))
        );
        assert_matches!(
            authorize(None, Access::OwnerOrAdmin(OWNED)),
            Err(CoreError::Unauthorized(_))
        );
    }

    #[test]
    fn admin_passes_every_rule() {
        let admin = principal("root", ROLE_ADMIN, None);
        for access in [
            Access::Authenticated,
            Access::Admin,
            Access::OwnerOrAdmin(OWNED),
            Access::AnyRole(&[ROLE_HR]),
            Access::OwnerOrRoles(OWNED, &[]),
        ] {
            assert!(authorize(Some(&admin), access).is_ok());
        }
    }

    #[test]
    fn owner_by_id() {
        let owner = principal("u-1", ROLE_TEACHER, None);
        assert!(authorize(Some(&owner), Access::OwnerOrAdmin(OWNED)).is_ok());
    }

    #[test]
    fn owner_by_email_ignores_case() {
        let owner = principal("other", ROLE_TEACHER, Some("OWNER@example.com"));
        assert!(authorize(Some(&owner), Access::OwnerOrAdmin(OWNED)).is_ok());
    }

    #[test]
    fn non_owner_is_forbidden() {
        let stranger = principal("u-2", ROLE_TEACHER, Some("someone@example.com"));
        assert_matches!(
            authorize(Some(&stranger), Access::OwnerOrAdmin(OWNED)),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn allow_listed_role() {
        let hr = principal("u-3", ROLE_HR, None);
        assert!(authorize(Some(&hr), Access::OwnerOrRoles(OWNED, &[ROLE_HR])).is_ok());
        assert_matches!(
            authorize(Some(&hr), Access::Admin),
            Err(CoreError::Forbidden(_))
        );
    }

    #[test]
    fn empty_ownership_is_never_owned() {
        let user = principal("u-1", ROLE_TEACHER, Some("owner@example.com"));
        assert!(!user.owns(&Ownership::default()));
    }

    #[test]
    fn private_view() {
        let owner = principal("u-1", ROLE_TEACHER, None);
        let stranger = principal("u-2", ROLE_TEACHER, None);
        assert!(can_view_private(Some(&owner), &OWNED));
        assert!(!can_view_private(Some(&stranger), &OWNED));
        assert!(!can_view_private(None, &OWNED));
    }
}
