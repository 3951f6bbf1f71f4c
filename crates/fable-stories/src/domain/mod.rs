//! Domain model for the Stories context.

pub mod aggregates;
pub mod commands;
