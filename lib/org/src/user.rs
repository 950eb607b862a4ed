//! User domain type.
//!
//! A user is a node in the manager hierarchy. The `manager_id` pointer is the
//! only hierarchy edge; the set of direct reports is derived from it.

use crate::role::Role;
use chrono::{DateTime, Utc};
use duebell_core::UserId;
use serde::{Deserialize, Serialize};

/// An employee or administrator known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal user ID.
    id: UserId,
    /// Login email, unique across the directory.
    email: String,
    /// Full name shown in notifications and pickers.
    display_name: Option<String>,
    /// Organizational role.
    role: Role,
    /// Inactive users keep their history but can no longer receive work.
    active: bool,
    /// The single manager of this user, if any.
    manager_id: Option<UserId>,
    /// When the user record was created.
    created_at: DateTime<Utc>,
    /// When the user record was last updated.
    updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new active user without a manager.
    #[must_use]
    pub fn new(email: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            email,
            display_name: None,
            role,
            active: true,
            manager_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Creates a user with all fields specified.
    ///
    /// Use this when reconstituting a user from storage.
    #[must_use]
    #[expect(clippy::too_many_arguments)]
    pub fn with_all_fields(
        id: UserId,
        email: String,
        display_name: Option<String>,
        role: Role,
        active: bool,
        manager_id: Option<UserId>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            display_name,
            role,
            active,
            manager_id,
            created_at,
            updated_at,
        }
    }

    /// Returns the user's ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the user's email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the user's display name, if set.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.display_name.as_deref()
    }

    /// Returns the user's role.
    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    /// Returns true if the user is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Returns true if the user is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns the user's manager, if any.
    #[must_use]
    pub fn manager_id(&self) -> Option<UserId> {
        self.manager_id
    }

    /// Returns when the user was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns when the user was last updated.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Sets the user's display name.
    pub fn set_display_name(&mut self, display_name: Option<String>) {
        self.display_name = display_name;
        self.updated_at = Utc::now();
    }

    /// Activates or deactivates the user.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.updated_at = Utc::now();
    }

    /// Replaces the manager pointer.
    ///
    /// This does not check for cycles; go through
    /// [`HierarchyGraph::reassign_manager`](crate::HierarchyGraph::reassign_manager)
    /// for any write that originates from a request.
    pub fn set_manager(&mut self, manager_id: Option<UserId>) {
        self.manager_id = manager_id;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_is_active_without_manager() {
        let user = User::new("alice@example.com".to_string(), Role::Staff);

        assert!(user.id().to_string().starts_with("usr_"));
        assert!(user.is_active());
        assert!(!user.is_admin());
        assert!(user.manager_id().is_none());
        assert!(user.display_name().is_none());
        assert_eq!(user.created_at(), user.updated_at());
    }

    #[test]
    fn set_manager_updates_timestamp() {
        let mut user = User::new("bob@example.com".to_string(), Role::Staff);
        let original_updated_at = user.updated_at();
        let manager = UserId::new();

        std::thread::sleep(std::time::Duration::from_millis(1));
        user.set_manager(Some(manager));

        assert_eq!(user.manager_id(), Some(manager));
        assert!(user.updated_at() > original_updated_at);
    }

    #[test]
    fn with_all_fields_preserves_values() {
        let id = UserId::new();
        let manager = UserId::new();
        let created = Utc::now() - chrono::Duration::days(30);
        let updated = Utc::now() - chrono::Duration::days(1);

        let user = User::with_all_fields(
            id,
            "carol@example.com".to_string(),
            Some("Carol".to_string()),
            Role::Admin,
            false,
            Some(manager),
            created,
            updated,
        );

        assert_eq!(user.id(), id);
        assert_eq!(user.email(), "carol@example.com");
        assert_eq!(user.display_name(), Some("Carol"));
        assert!(user.is_admin());
        assert!(!user.is_active());
        assert_eq!(user.manager_id(), Some(manager));
        assert_eq!(user.created_at(), created);
        assert_eq!(user.updated_at(), updated);
    }

    #[test]
    fn user_serialization_roundtrip() {
        let mut user = User::new("dave@example.com".to_string(), Role::Staff);
        user.set_display_name(Some("Dave".to_string()));

        let json = serde_json::to_string(&user).expect("serialize");
        let parsed: User = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(user, parsed);
    }
}
