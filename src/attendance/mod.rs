//! Attendance decision and aggregation rules.
//!
//! Everything here is pure: handlers load what they need from the store,
//! call into these functions, and persist the writes they return.

pub mod bulk;
pub mod decision;
pub mod geo;
pub mod sheet;
pub mod stats;
