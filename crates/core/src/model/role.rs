use thiserror::Error;

use crate::model::ids::RoleId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RoleError {
    #[error("role code cannot be empty")]
    EmptyCode,
}

/// A stakeholder role that questions can target, e.g. CEO or CISO.
///
/// The `UNIVERSAL` role is assigned to administrators who manage the system
/// and are never invited to surveys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    id: RoleId,
    description: String,
}

impl Role {
    /// Creates a new role.
    ///
    /// # Errors
    ///
    /// Returns `RoleError::EmptyCode` if the code is empty or whitespace-only.
    pub fn new(id: RoleId, description: impl Into<String>) -> Result<Self, RoleError> {
        if id.as_str().trim().is_empty() {
            return Err(RoleError::EmptyCode);
        }
        Ok(Self {
            id,
            description: description.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> &RoleId {
        &self.id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// True for the administrator role.
    #[must_use]
    pub fn is_administrator(&self) -> bool {
        self.id.is_universal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_new_rejects_empty_code() {
        let err = Role::new(RoleId::new("  "), "desc").unwrap_err();
        assert_eq!(err, RoleError::EmptyCode);
    }

    #[test]
    fn universal_role_is_administrator() {
        let role = Role::new(RoleId::universal(), "admins only").unwrap();
        assert!(role.is_administrator());

        let ceo = Role::new(RoleId::new("CEO"), "chief executive").unwrap();
        assert!(!ceo.is_administrator());
    }
}
