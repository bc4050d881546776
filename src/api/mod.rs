pub mod attendance;
pub mod changes;
pub mod employee;
pub mod request;
pub mod settings;
pub mod shift;
pub mod statistics;
