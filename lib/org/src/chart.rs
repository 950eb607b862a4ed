//! In-memory organization chart.
//!
//! The chart is a forest stored as a petgraph arena: one node per user, one
//! edge from each manager to each direct report. Node indices are resolved
//! through a `UserId -> NodeIndex` map, so lookups are O(1) and traversal
//! never chases pointers through `User` values.
//!
//! The chart implements [`UserDirectory`], which makes it usable both as a
//! snapshot for batch jobs and as the directory in tests.

use crate::directory::{DirectReports, UserDirectory};
use crate::error::DirectoryError;
use crate::user::User;
use async_trait::async_trait;
use duebell_core::{Result, UserId};
use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct ChartInner {
    /// Manager -> report edges.
    graph: DiGraph<UserId, ()>,
    /// Map from UserId to petgraph's NodeIndex.
    index: HashMap<UserId, NodeIndex>,
    users: HashMap<UserId, User>,
}

impl ChartInner {
    fn node(&mut self, id: UserId) -> NodeIndex {
        if let Some(index) = self.index.get(&id) {
            return *index;
        }
        let index = self.graph.add_node(id);
        self.index.insert(id, index);
        index
    }

    fn unlink(&mut self, employee: UserId) {
        let Some(old_manager) = self.users.get(&employee).and_then(User::manager_id) else {
            return;
        };
        let (Some(&from), Some(&to)) = (self.index.get(&old_manager), self.index.get(&employee))
        else {
            return;
        };
        if let Some(edge) = self.graph.find_edge(from, to) {
            self.graph.remove_edge(edge);
        }
    }

    fn link(&mut self, employee: UserId, manager: UserId) {
        let from = self.node(manager);
        let to = self.node(employee);
        self.graph.update_edge(from, to, ());
    }
}

/// An in-memory user directory backed by a manager forest.
#[derive(Debug, Default)]
pub struct OrgChart {
    inner: RwLock<ChartInner>,
}

impl OrgChart {
    /// Creates an empty chart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a chart from a directory snapshot.
    ///
    /// Manager pointers that reference users missing from the snapshot are
    /// kept on the `User` but produce no edge.
    #[must_use]
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        let mut inner = ChartInner::default();
        let users: Vec<User> = users.into_iter().collect();
        for user in &users {
            inner.node(user.id());
        }
        for user in &users {
            if let Some(manager) = user.manager_id().filter(|m| inner.index.contains_key(m)) {
                inner.link(user.id(), manager);
            }
        }
        inner.users = users.into_iter().map(|u| (u.id(), u)).collect();
        Self {
            inner: RwLock::new(inner),
        }
    }

    /// Adds or replaces a user, trusting its manager pointer as stored.
    pub fn insert(&self, user: User) {
        let mut inner = self.write();
        let id = user.id();
        inner.unlink(id);
        inner.node(id);
        if let Some(manager) = user.manager_id().filter(|m| inner.users.contains_key(m)) {
            inner.link(id, manager);
        }
        inner.users.insert(id, user);
    }

    /// Returns the number of users in the chart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().users.len()
    }

    /// Returns true if the chart has no users.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true if `descendant` is reachable from `ancestor` along
    /// manager -> report edges (a user reaches themselves).
    #[must_use]
    pub fn reaches(&self, ancestor: UserId, descendant: UserId) -> bool {
        let inner = self.read();
        match (inner.index.get(&ancestor), inner.index.get(&descendant)) {
            (Some(&from), Some(&to)) => has_path_connecting(&inner.graph, from, to, None),
            _ => ancestor == descendant,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, ChartInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ChartInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl DirectReports for OrgChart {
    async fn direct_reports_of(&self, manager: UserId) -> Result<Vec<UserId>, DirectoryError> {
        let inner = self.read();
        let Some(&index) = inner.index.get(&manager) else {
            return Ok(Vec::new());
        };
        let mut reports: Vec<UserId> = inner
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .map(|n| inner.graph[n])
            .collect();
        reports.sort();
        Ok(reports)
    }
}

#[async_trait]
impl UserDirectory for OrgChart {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, DirectoryError> {
        Ok(self.read().users.get(&id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, DirectoryError> {
        let mut users: Vec<User> = self.read().users.values().cloned().collect();
        users.sort_by_key(User::id);
        Ok(users)
    }

    async fn set_manager(
        &self,
        employee: UserId,
        manager: Option<UserId>,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.write();
        if !inner.users.contains_key(&employee) {
            return Err(DirectoryError::UserNotFound { id: employee }.into());
        }
        if let Some(manager) = manager {
            if !inner.users.contains_key(&manager) {
                return Err(DirectoryError::UserNotFound { id: manager }.into());
            }
            let (from, to) = (inner.index[&employee], inner.index[&manager]);
            if employee == manager || has_path_connecting(&inner.graph, from, to, None) {
                return Err(DirectoryError::EdgeRejected { employee, manager }.into());
            }
        }

        inner.unlink(employee);
        if let Some(manager) = manager {
            inner.link(employee, manager);
        }
        if let Some(user) = inner.users.get_mut(&employee) {
            user.set_manager(manager);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::Role;

    fn staff(name: &str, manager: Option<&User>) -> User {
        let mut user = User::new(format!("{name}@example.com"), Role::Staff);
        user.set_display_name(Some(name.to_string()));
        user.set_manager(manager.map(User::id));
        user
    }

    #[tokio::test]
    async fn reports_follow_manager_pointers() {
        let ceo = staff("ceo", None);
        let cto = staff("cto", Some(&ceo));
        let dev = staff("dev", Some(&cto));
        let chart = OrgChart::from_users([ceo.clone(), cto.clone(), dev.clone()]);

        assert_eq!(chart.direct_reports_of(ceo.id()).await.unwrap(), vec![cto.id()]);
        assert_eq!(chart.direct_reports_of(cto.id()).await.unwrap(), vec![dev.id()]);
        assert!(chart.direct_reports_of(dev.id()).await.unwrap().is_empty());
        assert!(chart.reaches(ceo.id(), dev.id()));
        assert!(!chart.reaches(dev.id(), ceo.id()));
    }

    #[tokio::test]
    async fn dangling_manager_produces_no_edge() {
        let ghost = UserId::new();
        let mut orphan = User::new("orphan@example.com".to_string(), Role::Staff);
        orphan.set_manager(Some(ghost));
        let chart = OrgChart::from_users([orphan.clone()]);

        assert!(chart.direct_reports_of(ghost).await.unwrap().is_empty());
        let stored = chart.find_user(orphan.id()).await.unwrap().unwrap();
        assert_eq!(stored.manager_id(), Some(ghost));
    }

    #[tokio::test]
    async fn unknown_manager_has_no_reports() {
        let chart = OrgChart::new();
        assert!(chart.is_empty());
        assert!(chart.direct_reports_of(UserId::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_manager_moves_the_edge() {
        let a = staff("a", None);
        let b = staff("b", None);
        let c = staff("c", Some(&a));
        let chart = OrgChart::from_users([a.clone(), b.clone(), c.clone()]);

        chart.set_manager(c.id(), Some(b.id())).await.unwrap();

        assert!(chart.direct_reports_of(a.id()).await.unwrap().is_empty());
        assert_eq!(chart.direct_reports_of(b.id()).await.unwrap(), vec![c.id()]);
        let moved = chart.find_user(c.id()).await.unwrap().unwrap();
        assert_eq!(moved.manager_id(), Some(b.id()));

        chart.set_manager(c.id(), None).await.unwrap();
        assert!(chart.direct_reports_of(b.id()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_manager_refuses_cycles() {
        let a = staff("a", None);
        let b = staff("b", Some(&a));
        let chart = OrgChart::from_users([a.clone(), b.clone()]);

        let err = chart.set_manager(a.id(), Some(b.id())).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            DirectoryError::EdgeRejected { .. }
        ));

        let err = chart.set_manager(a.id(), Some(a.id())).await.unwrap_err();
        assert!(matches!(
            err.current_context(),
            DirectoryError::EdgeRejected { .. }
        ));

        // Nothing moved.
        assert_eq!(chart.direct_reports_of(a.id()).await.unwrap(), vec![b.id()]);
    }

    #[tokio::test]
    async fn insert_replaces_user_and_edge() {
        let a = staff("a", None);
        let b = staff("b", None);
        let chart = OrgChart::from_users([a.clone(), b.clone()]);

        let mut c = staff("c", Some(&a));
        chart.insert(c.clone());
        assert_eq!(chart.len(), 3);
        assert_eq!(chart.direct_reports_of(a.id()).await.unwrap(), vec![c.id()]);

        c.set_manager(Some(b.id()));
        chart.insert(c.clone());
        assert!(chart.direct_reports_of(a.id()).await.unwrap().is_empty());
        assert_eq!(chart.direct_reports_of(b.id()).await.unwrap(), vec![c.id()]);
    }
}
