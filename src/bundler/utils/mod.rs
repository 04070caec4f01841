//! Shared helpers for bundling: filesystem operations and external commands.

pub mod command;
pub mod fs;
