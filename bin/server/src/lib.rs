//! duebell server.
//!
//! Loads configuration, connects to Postgres, and runs the meeting-reminder
//! and task-follow-up engines against the stores in [`db`].

pub mod config;
pub mod db;
pub mod services;
