//! Model discovery and probing.
//!
//! For a single key, finds out:
//! - Which models the provider lists for it
//! - Which of those actually answer a trivial prompt
//! - How long each answer took, or why it failed

pub mod catalog;
pub mod prober;
