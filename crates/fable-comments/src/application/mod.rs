//! Use cases and storage ports for the Comments context.

pub mod command_handlers;
pub mod ports;
pub mod query_handlers;
