//! Queries shared by several handlers. Single-use queries stay next to the
//! handler that runs them.

pub mod attendance;
pub mod employee;
pub mod settings;
