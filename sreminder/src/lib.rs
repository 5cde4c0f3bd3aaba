//! sreminder library
//!
//! Reminder recurrence engine for a personal notes application, exposed
//! as a library for the binary and for integration tests.

pub mod app;
pub mod calendar;
pub mod config;
pub mod database;
pub mod error;
pub mod services;
