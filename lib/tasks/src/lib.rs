//! Tasks for duebell.
//!
//! This crate provides:
//!
//! - **Tasks**: Status, priority, assignment, and the follow-up instant
//! - **Lifecycle**: Create, update, the two-step close workflow, and delete,
//!   authorized against the manager hierarchy
//! - **Discussion**: Messages between creator and assignee
//! - **Repositories**: The storage seams, plus an in-memory store

pub mod discussion;
pub mod error;
pub mod lifecycle;
pub mod memory;
pub mod repository;
pub mod task;

pub use discussion::{TaskDiscussion, TaskMessage};
pub use error::TaskError;
pub use lifecycle::TaskLifecycle;
pub use memory::InMemoryTaskStore;
pub use repository::{TaskMessageRepository, TaskRepository};
pub use task::{NewTask, Task, TaskListing, TaskPatch, TaskPriority, TaskStatus, UnknownValue};
