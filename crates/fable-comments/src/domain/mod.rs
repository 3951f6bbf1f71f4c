//! Domain model for the Comments context.

pub mod aggregates;
pub mod commands;
pub mod read_models;
