use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of the caller as asserted by the identity provider.
///
/// Every UI-level gate ("isAdmin", "isEmployer") is re-checked against this
/// value on the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Talent,
    Employer,
    Recruiter,
    Admin,
}

impl UserRole {
    #[inline]
    pub const fn code(&self) -> &'static str {
        use UserRole::*;
        match self {
            Talent => "talent",
            Employer => "employer",
            Recruiter => "recruiter",
            Admin => "admin",
        }
    }

    #[inline]
    pub fn from_code(code: &str) -> Option<Self> {
        use UserRole::*;
        match code {
            "talent" => Some(Talent),
            "employer" => Some(Employer),
            "recruiter" => Some(Recruiter),
            "admin" => Some(Admin),
            _ => None,
        }
    }

    /// Employers and recruiters post jobs and buy promotion.
    #[inline]
    pub const fn is_hiring(&self) -> bool {
        matches!(self, UserRole::Employer | UserRole::Recruiter | UserRole::Admin)
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_role_codes_round_trip() {
        for role in [
            UserRole::Talent,
            UserRole::Employer,
            UserRole::Recruiter,
            UserRole::Admin,
        ] {
            assert_eq!(UserRole::from_code(role.code()), Some(role));
        }
        assert_eq!(UserRole::from_code("super_admin"), None);
    }

    #[test]
    fn test_user_role_checks() {
        assert!(!UserRole::Talent.is_hiring());
        assert!(UserRole::Employer.is_hiring());
        assert!(UserRole::Recruiter.is_hiring());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Employer.is_admin());
    }
}
