//! Core types for the Spindle runtime.
//!
//! This module contains the fundamental types used throughout the runtime:
//!
//! - [`id`]: the [`TaskId`] identifier type and its allocation

pub mod id;

pub use id::TaskId;
