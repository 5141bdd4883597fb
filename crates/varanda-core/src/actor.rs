//! # Actor and Session
//!
//! Every row is partitioned by `owner_id`. Employees act under their
//! owner's id, so the effective owner is resolved once when the session is
//! built and passed to every service call.
//!
//! ```text
//! Actor { user_id: "emp-1", role: Employee { owner_id: "own-1" } }
//!        │
//!        ▼  Session::resolve
//! Session { effective_owner_id: "own-1", user_id: "emp-1" }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    Owner,
    Employee { owner_id: String },
}

/// An authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub user_id: String,
    pub role: Role,
}

impl Actor {
    pub fn owner(user_id: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
            role: Role::Owner,
        }
    }

    pub fn employee(user_id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        Actor {
            user_id: user_id.into(),
            role: Role::Employee {
                owner_id: owner_id.into(),
            },
        }
    }
}

/// Resolved caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    actor: Actor,
    effective_owner_id: String,
}

impl Session {
    /// Resolves the effective owner for an actor.
    ///
    /// ## Example
    /// ```rust
    /// use varanda_core::actor::{Actor, Session};
    ///
    /// let session = Session::resolve(Actor::employee("emp-1", "own-1")).unwrap();
    /// assert_eq!(session.effective_owner_id(), "own-1");
    /// assert_eq!(session.user_id(), "emp-1");
    /// ```
    pub fn resolve(actor: Actor) -> CoreResult<Self> {
        if actor.user_id.trim().is_empty() {
            return Err(CoreError::NotAuthenticated);
        }
        let effective_owner_id = match &actor.role {
            Role::Owner => actor.user_id.clone(),
            Role::Employee { owner_id } if !owner_id.trim().is_empty() => owner_id.clone(),
            Role::Employee { .. } => return Err(CoreError::NotAuthenticated),
        };
        Ok(Session {
            actor,
            effective_owner_id,
        })
    }

    /// Turns a possibly missing session into the precondition error.
    pub fn require(session: Option<&Session>) -> CoreResult<&Session> {
        session.ok_or(CoreError::NotAuthenticated)
    }

    #[inline]
    pub fn effective_owner_id(&self) -> &str {
        &self.effective_owner_id
    }

    #[inline]
    pub fn user_id(&self) -> &str {
        &self.actor.user_id
    }

    #[inline]
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    pub fn is_employee(&self) -> bool {
        matches!(self.actor.role, Role::Employee { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_acts_as_self() {
        let session = Session::resolve(Actor::owner("own-1")).unwrap();
        assert_eq!(session.effective_owner_id(), "own-1");
        assert!(!session.is_employee());
    }

    #[test]
    fn test_employee_without_owner_is_rejected() {
        let err = Session::resolve(Actor::employee("emp-1", "  ")).unwrap_err();
        assert_eq!(err, CoreError::NotAuthenticated);
    }

    #[test]
    fn test_missing_session() {
        assert_eq!(
            Session::require(None).unwrap_err(),
            CoreError::NotAuthenticated
        );
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Actor::employee("e", "o")).unwrap();
        assert_eq!(
            json,
            r#"{"user_id":"e","role":{"kind":"employee","owner_id":"o"}}"#
        );
    }
}
