//! Multisig Common Types
//!
//! This crate contains shared types used across the multisig wallet,
//! including identities, amounts, the error taxonomy and the facts the
//! wallet emits for indexers.

pub mod identifiers;
pub mod monetary;
pub mod error;
pub mod event;

pub use identifiers::*;
pub use monetary::*;
pub use error::*;
pub use event::*;
