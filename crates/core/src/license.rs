//! License lifecycle states and the transitions allowed between them.

use crate::error::CoreError;

pub const LICENSE_PENDING: &str = "pending";
pub const LICENSE_ACTIVE: &str = "active";
pub const LICENSE_EXPIRED: &str = "expired";
pub const LICENSE_FAILED: &str = "failed";
pub const LICENSE_REVOKED: &str = "revoked";
pub const LICENSE_SUPERSEDED: &str = "superseded";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    /// Checkout started, payment not confirmed yet.
    Pending,
    Active,
    Expired,
    Failed,
    Revoked,
    /// Replaced by a newer active license for the same user.
    Superseded,
}

impl LicenseStatus {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            LICENSE_PENDING => Ok(Self::Pending),
            LICENSE_ACTIVE => Ok(Self::Active),
            LICENSE_EXPIRED => Ok(Self::Expired),
            LICENSE_FAILED => Ok(Self::Failed),
            LICENSE_REVOKED => Ok(Self::Revoked),
            LICENSE_SUPERSEDED => Ok(Self::Superseded),
            other => Err(CoreError::Validation(format!(
                "Unknown license status '{other}'"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => LICENSE_PENDING,
            Self::Active => LICENSE_ACTIVE,
            Self::Expired => LICENSE_EXPIRED,
            Self::Failed => LICENSE_FAILED,
            Self::Revoked => LICENSE_REVOKED,
            Self::Superseded => LICENSE_SUPERSEDED,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Expired | Self::Failed | Self::Revoked | Self::Superseded
        )
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    pub fn can_transition(self, next: LicenseStatus) -> bool {
        use LicenseStatus::*;
        matches!(
            (self, next),
            (Pending, Active | Expired | Failed | Revoked)
                | (Active, Superseded | Revoked | Expired)
        )
    }

    /// Like [`can_transition`](Self::can_transition) but produces a conflict error.
    pub fn ensure_transition(self, next: LicenseStatus) -> Result<(), CoreError> {
        if self.can_transition(next) {
            Ok(())
        } else {
            Err(CoreError::Conflict(format!(
                "License cannot move from '{}' to '{}'",
                self.as_str(),
                next.as_str()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_settle_any_way() {
        let p = LicenseStatus::Pending;
        assert!(p.can_transition(LicenseStatus::Active));
        assert!(p.can_transition(LicenseStatus::Expired));
        assert!(p.can_transition(LicenseStatus::Failed));
        assert!(!p.can_transition(LicenseStatus::Superseded));
    }

    #[test]
    fn active_can_be_superseded_or_revoked() {
        let a = LicenseStatus::Active;
        assert!(a.can_transition(LicenseStatus::Superseded));
        assert!(a.can_transition(LicenseStatus::Revoked));
        assert!(!a.can_transition(LicenseStatus::Pending));
        assert!(!a.can_transition(LicenseStatus::Failed));
    }

    #[test]
    fn terminal_states_are_final() {
        for s in [
            LicenseStatus::Expired,
            LicenseStatus::Failed,
            LicenseStatus::Revoked,
            LicenseStatus::Superseded,
        ] {
            assert!(s.is_terminal());
            assert!(!s.can_transition(LicenseStatus::Active));
            assert!(s.ensure_transition(LicenseStatus::Active).is_err());
        }
    }

    #[test]
    fn parse_known_names() {
        assert_eq!(LicenseStatus::parse("active").unwrap(), LicenseStatus::Active);
        assert!(LicenseStatus::parse("paused").is_err());
    }
}
