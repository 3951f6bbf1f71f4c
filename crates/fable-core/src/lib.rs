//! Fable Core: shared domain abstractions.
//!
//! This crate defines the traits and value types every bounded context
//! depends on: aggregate and repository contracts, the optimistic-lock
//! watermark store, and keyset pagination cursors. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod pagination;
pub mod repository;
pub mod watermark;
