//! Organization model for duebell.
//!
//! This crate provides:
//!
//! - **Users and roles**: Staff and administrators, each with at most one manager
//! - **Directory traits**: The storage seam for users and direct reports
//! - **Hierarchy**: Cycle-safe reachability, assignable users, and manager edits
//! - **Org chart**: An in-memory directory backed by a petgraph forest

pub mod chart;
pub mod directory;
pub mod error;
pub mod hierarchy;
pub mod role;
pub mod user;

pub use chart::OrgChart;
pub use directory::{DirectReports, UserDirectory};
pub use error::{DirectoryError, HierarchyError};
pub use hierarchy::HierarchyGraph;
pub use role::{Role, UnknownRole};
pub use user::User;
