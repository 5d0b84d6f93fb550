// Path: crates/types/src/lib.rs
#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! # Strata Types
//!
//! This crate is the foundational library for the Strata node, containing the
//! transaction model, account and resolution records, consensus callback
//! request/response types, configuration objects and every error enum.
//!
//! ## Architectural Role
//!
//! As the base crate, `strata-types` has minimal dependencies and is itself a
//! dependency for every other crate in the workspace. This prevents circular
//! dependencies and gives one canonical definition for consensus-critical
//! encodings such as `Transaction` and `Resolution`.

/// The maximum size in bytes for a single value read from consensus state.
pub const MAX_STATE_VALUE_BYTES: usize = 256 * 1024; // 256 KiB

/// A top-level, crate-wide `Result` type alias with a default error type.
pub type Result<T, E = crate::error::AppError> = std::result::Result<T, E>;

/// Application-level data structures: transactions, payloads, accounts,
/// validators, resolutions and consensus callback messages.
pub mod app;
/// The canonical, deterministic binary codec for consensus-critical state.
pub mod codec;
/// Node, genesis and consensus parameter configuration.
pub mod config;
/// A unified set of all error types used across the workspace.
pub mod error;
/// Constants for well-known state keys and key builders.
pub mod keys;
/// The versioned binary codec for vote-extension segments.
pub mod vote_extension;
