//! Session identity supplied by the authentication boundary.
//!
//! The core never reads ambient session state. Every operation that needs to know who is
//! acting receives an [`Identity`], created at login and destroyed at logout or on an
//! access-denied response. Role and location are read-only inputs to zone scoping.

use serde::{Deserialize, Serialize};

use crate::{ReferError, ReferResult};

/// Staff role. A closed set; roles are not escalated post creation outside the
/// admin edit form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access, including user management.
    Admin,
    /// Hospital staff: full patient/appointment access across zones.
    Hospital,
    /// Community health center staff, bound to a single zone.
    Hc,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Hospital => "hospital",
            Role::Hc => "hc",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = ReferError;

    fn from_str(s: &str) -> ReferResult<Self> {
        match s {
            "admin" => Ok(Role::Admin),
            "hospital" => Ok(Role::Hospital),
            "hc" => Ok(Role::Hc),
            other => Err(ReferError::Validation(format!("unknown role: {other}"))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much of the network an identity may see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ZoneScope<'a> {
    /// Hospital and admin staff: every zone.
    All,
    /// HC staff: the one bound zone.
    Zone(&'a str),
    /// An `hc` account with no zone binding. Matches nothing: a misconfigured
    /// account must not widen into hospital-level visibility.
    Nothing,
}

/// The authenticated actor behind a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub username: String,
    pub role: Role,
    /// Zone binding; meaningful for `Hc` users, informational otherwise.
    pub location: Option<String>,
}

impl Identity {
    pub fn new(username: impl Into<String>, role: Role, location: Option<String>) -> Self {
        Self {
            username: username.into(),
            role,
            location,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Hospital and admin staff manage patients and appointments; HC staff only
    /// record visits within their zone.
    pub fn can_manage_records(&self) -> bool {
        matches!(self.role, Role::Admin | Role::Hospital)
    }

    /// The read scope this identity carries.
    pub fn zone_scope(&self) -> ZoneScope<'_> {
        match self.role {
            Role::Admin | Role::Hospital => ZoneScope::All,
            Role::Hc => match self.location.as_deref() {
                Some(zone) if !zone.trim().is_empty() => ZoneScope::Zone(zone),
                _ => ZoneScope::Nothing,
            },
        }
    }

    /// Guard helper for admin-only operations.
    pub fn require_admin(&self) -> ReferResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ReferError::Forbidden("admin only".into()))
        }
    }

    /// Guard helper for hospital/admin record management.
    pub fn require_record_manager(&self) -> ReferResult<()> {
        if self.can_manage_records() {
            Ok(())
        } else {
            Err(ReferError::Forbidden(
                "only hospital or admin staff may perform this action".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hc_identity_is_bound_to_its_zone() {
        let identity = Identity::new("nurse1", Role::Hc, Some("Ban Puan Phu HPH".into()));
        assert_eq!(identity.zone_scope(), ZoneScope::Zone("Ban Puan Phu HPH"));
        assert!(identity.require_record_manager().is_err());
    }

    #[test]
    fn hospital_identity_is_unscoped_even_with_location() {
        let identity = Identity::new("clerk", Role::Hospital, Some("anywhere".into()));
        assert_eq!(identity.zone_scope(), ZoneScope::All);
        assert!(identity.require_record_manager().is_ok());
        assert!(identity.require_admin().is_err());
    }

    #[test]
    fn hc_identity_without_a_zone_scopes_to_nothing() {
        let unbound = Identity::new("nurse", Role::Hc, None);
        assert_eq!(unbound.zone_scope(), ZoneScope::Nothing);

        let blank = Identity::new("nurse", Role::Hc, Some("  ".into()));
        assert_eq!(blank.zone_scope(), ZoneScope::Nothing);
    }

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::Admin, Role::Hospital, Role::Hc] {
            let parsed: Role = role.as_str().parse().expect("parse role");
            assert_eq!(parsed, role);
        }
        assert!("doctor".parse::<Role>().is_err());
    }
}
