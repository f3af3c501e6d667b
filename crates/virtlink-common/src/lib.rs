// ============================================
// File: crates/virtlink-common/src/lib.rs
// ============================================
//! # Virtlink Common - Shared Types Library
//!
//! ## Creation Reason
//! Provides the foundational types shared across all virtlink crates:
//! the transport-level peer identifier and the common error types.
//!
//! ## Main Functionality
//! - [`types`]: Core type definitions (`VirtualAddr`)
//! - [`error`]: Common error types and result alias
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               virtlink-core                         │
//! │                    │                                │
//! │                    ▼                                │
//! │             virtlink-transport                      │
//! │                    │                                │
//! │                    ▼                                │
//! │             virtlink-common  ◄── You are here       │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal
//! - All public types should implement standard traits (Debug, Clone, etc.)

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use types::VirtualAddr;
