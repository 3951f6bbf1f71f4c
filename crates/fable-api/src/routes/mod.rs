//! Route modules organized by bounded context.

pub mod comments;
pub mod health;
pub mod stories;

#[cfg(test)]
mod testing;
