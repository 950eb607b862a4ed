//! Manager hierarchy queries.
//!
//! All traversal is breadth-first over [`DirectReports::direct_reports_of`]
//! with a visited set, so malformed data (a cycle written by an older
//! release, a manager pointer to a deleted user) terminates and costs at
//! most one lookup per reachable user. A missing user is a leaf, never an
//! error.

use crate::directory::{DirectReports, UserDirectory};
use crate::error::{DirectoryError, HierarchyError};
use crate::user::User;
use duebell_core::{Result, UserId};
use rootcause::prelude::ResultExt;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Reachability queries over the manager forest.
#[derive(Debug)]
pub struct HierarchyGraph<D: ?Sized> {
    directory: Arc<D>,
}

impl<D: ?Sized> Clone for HierarchyGraph<D> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
        }
    }
}

impl<D: DirectReports + ?Sized> HierarchyGraph<D> {
    /// Creates a graph over the given directory.
    pub fn new(directory: Arc<D>) -> Self {
        Self { directory }
    }

    /// Returns the underlying directory.
    pub fn directory(&self) -> &Arc<D> {
        &self.directory
    }

    /// Returns true if `descendant` is `ancestor` or sits anywhere below it.
    pub async fn is_subordinate(
        &self,
        ancestor: UserId,
        descendant: UserId,
    ) -> Result<bool, DirectoryError> {
        if ancestor == descendant {
            return Ok(true);
        }

        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([ancestor]);
        while let Some(current) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            for report in self.directory.direct_reports_of(current).await? {
                if report == descendant {
                    return Ok(true);
                }
                queue.push_back(report);
            }
        }
        Ok(false)
    }

    /// Returns true if `manager` sits strictly above `employee`.
    ///
    /// Nobody manages themselves.
    pub async fn is_manager_of(
        &self,
        manager: UserId,
        employee: UserId,
    ) -> Result<bool, DirectoryError> {
        if manager == employee {
            return Ok(false);
        }
        self.is_subordinate(manager, employee).await
    }

    /// Returns true if making `new_manager` the manager of `employee` would
    /// close a loop.
    pub async fn would_create_cycle(
        &self,
        employee: UserId,
        new_manager: UserId,
    ) -> Result<bool, DirectoryError> {
        if employee == new_manager {
            return Ok(true);
        }
        self.is_subordinate(employee, new_manager).await
    }

    /// Returns every user below `root`, nearest first, without `root` itself.
    pub async fn subordinates_of(&self, root: UserId) -> Result<Vec<UserId>, DirectoryError> {
        let mut visited = HashSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut out = Vec::new();
        while let Some(current) = queue.pop_front() {
            for report in self.directory.direct_reports_of(current).await? {
                if visited.insert(report) {
                    out.push(report);
                    queue.push_back(report);
                }
            }
        }
        Ok(out)
    }
}

impl<D: UserDirectory + ?Sized> HierarchyGraph<D> {
    /// Lists the users `actor` may assign tasks to.
    ///
    /// Administrators see every active non-admin user plus themselves. Everyone
    /// else sees themselves plus their whole active, non-admin subtree. The
    /// actor is always listed, even when inactive. The result is sorted by
    /// display name, case-insensitively, unnamed users last.
    #[instrument(skip(self, actor), fields(actor = %actor.id(), admin = actor.is_admin()))]
    pub async fn assignable_users(&self, actor: &User) -> Result<Vec<User>, DirectoryError> {
        let users: HashMap<UserId, User> = self
            .directory
            .list_users()
            .await?
            .into_iter()
            .map(|u| (u.id(), u))
            .collect();

        let mut out: Vec<User> = if actor.is_admin() {
            users
                .into_values()
                .filter(|u| u.is_active() && !u.is_admin())
                .collect()
        } else {
            let mut out = Vec::new();
            for id in self.subordinates_of(actor.id()).await? {
                match users.get(&id) {
                    Some(u) if u.is_active() && !u.is_admin() => out.push(u.clone()),
                    Some(_) => {}
                    None => debug!(user = %id, "skipping dangling report"),
                }
            }
            out
        };
        out.push(actor.clone());

        out.sort_by_cached_key(|u| {
            let name = u.display_name().map(str::to_lowercase);
            (name.is_none(), name)
        });
        Ok(out)
    }

    /// Points `employee` at `new_manager`, or clears the pointer.
    ///
    /// The cycle check runs before the pointer is touched. The directory
    /// checks again as it writes, which catches an edge committed by a
    /// concurrent edit in between.
    #[instrument(skip(self))]
    pub async fn reassign_manager(
        &self,
        employee: UserId,
        new_manager: Option<UserId>,
    ) -> Result<(), HierarchyError> {
        if let Some(manager) = new_manager {
            let exists = self
                .directory
                .find_user(manager)
                .await
                .context(HierarchyError::Lookup { employee })?
                .is_some();
            if !exists {
                return Err(HierarchyError::ManagerNotFound { manager }.into());
            }
            if self
                .would_create_cycle(employee, manager)
                .await
                .context(HierarchyError::Lookup { employee })?
            {
                return Err(HierarchyError::WouldCreateCycle { employee, manager }.into());
            }
        }

        let written = self.directory.set_manager(employee, new_manager).await;
        let rejected = matches!(
            &written,
            Err(report) if matches!(report.current_context(), DirectoryError::EdgeRejected { .. })
        );
        match (written, new_manager) {
            (Err(report), Some(manager)) if rejected => {
                debug!(%manager, "manager edge refused by the directory");
                Err(report).context(HierarchyError::WouldCreateCycle { employee, manager })
            }
            (written, _) => {
                written.context(HierarchyError::Lookup { employee })?;
                debug!("manager pointer updated");
                Ok(())
            }
        }
    }
}
