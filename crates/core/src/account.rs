//! Staff accounts and credential verification.
//!
//! User management is admin-only. Passwords are stored as SHA-256 hex digests;
//! token issuing lives at the API boundary, which consumes the [`Identity`] this
//! module produces on successful authentication.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::session::{Identity, Role};
use crate::store::Gateway;
use crate::{ReferError, ReferResult};

/// A staff account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    /// SHA-256 hex digest. Serialization exists for the gateway snapshot only;
    /// API responses use their own user representation without this field.
    pub password_hash: String,
    pub role: Role,
    /// Bound zone for `hc` users.
    pub location_name: Option<String>,
    pub name: Option<String>,
    pub position: Option<String>,
}

impl User {
    /// The session identity this account produces at login.
    pub fn identity(&self) -> Identity {
        Identity::new(self.username.clone(), self.role, self.location_name.clone())
    }
}

/// Payload for creating an account.
#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub role: Role,
    pub location_name: Option<String>,
    pub name: Option<String>,
    pub position: Option<String>,
}

/// Partial update for an account; `None` fields are left untouched.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserPatch {
    pub password: Option<String>,
    pub role: Option<Role>,
    pub location_name: Option<String>,
    pub name: Option<String>,
    pub position: Option<String>,
}

/// Hashed account row as the gateway stores it.
#[derive(Clone, Debug)]
pub struct NewUserRecord {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub location_name: Option<String>,
    pub name: Option<String>,
    pub position: Option<String>,
}

/// Hashed partial update as the gateway applies it.
#[derive(Clone, Debug, Default)]
pub struct UserPatchRecord {
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    pub location_name: Option<String>,
    pub name: Option<String>,
    pub position: Option<String>,
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Constant-shape comparison of a candidate password against a stored digest.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password) == stored_hash
}

/// An `hc` account must carry its zone; zone scoping treats a zoneless `hc`
/// identity as seeing nothing, so such an account would be unusable.
fn require_zone_for_hc(role: Role, location_name: Option<&str>) -> ReferResult<()> {
    if role == Role::Hc && location_name.map_or(true, |l| l.trim().is_empty()) {
        return Err(ReferError::Validation(
            "hc accounts require a location_name".into(),
        ));
    }
    Ok(())
}

/// Account administration and authentication.
#[derive(Clone)]
pub struct UserAdmin {
    gateway: Arc<dyn Gateway>,
}

impl UserAdmin {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Verify credentials. Failures are uniform so the response does not reveal
    /// whether the username exists.
    pub fn authenticate(&self, username: &str, password: &str) -> ReferResult<User> {
        let user = self
            .gateway
            .find_user_by_username(username)?
            .ok_or(ReferError::Unauthorized)?;

        if verify_password(password, &user.password_hash) {
            Ok(user)
        } else {
            Err(ReferError::Unauthorized)
        }
    }

    pub fn list(&self, identity: &Identity) -> ReferResult<Vec<User>> {
        identity.require_admin()?;
        self.gateway.list_users()
    }

    pub fn create(&self, identity: &Identity, new: NewUser) -> ReferResult<User> {
        identity.require_admin()?;

        if new.username.trim().is_empty() {
            return Err(ReferError::Validation("username is required".into()));
        }
        if new.password.is_empty() {
            return Err(ReferError::Validation("password is required".into()));
        }
        require_zone_for_hc(new.role, new.location_name.as_deref())?;

        self.gateway.insert_user(NewUserRecord {
            username: new.username,
            password_hash: hash_password(&new.password),
            role: new.role,
            location_name: new.location_name,
            name: new.name,
            position: new.position,
        })
    }

    pub fn update(&self, identity: &Identity, id: i64, patch: UserPatch) -> ReferResult<User> {
        identity.require_admin()?;

        let current = self
            .gateway
            .find_user(id)?
            .ok_or(ReferError::NotFound("user"))?;
        let effective_role = patch.role.unwrap_or(current.role);
        let effective_location = patch
            .location_name
            .as_deref()
            .or(current.location_name.as_deref());
        require_zone_for_hc(effective_role, effective_location)?;

        let password_hash = match patch.password.as_deref() {
            Some("") | None => None,
            Some(pw) => Some(hash_password(pw)),
        };

        self.gateway.update_user(
            id,
            UserPatchRecord {
                password_hash,
                role: patch.role,
                location_name: patch.location_name,
                name: patch.name,
                position: patch.position,
            },
        )
    }

    /// Delete an account; self-deletion is blocked so an admin cannot lock the
    /// instance out from under their own session.
    pub fn delete(&self, identity: &Identity, id: i64) -> ReferResult<()> {
        identity.require_admin()?;

        if let Some(target) = self.gateway.find_user(id)? {
            if target.username == identity.username {
                return Err(ReferError::Validation("cannot delete yourself".into()));
            }
        } else {
            return Err(ReferError::NotFound("user"));
        }

        self.gateway.delete_user(id)
    }
}
