pub mod attendance;
pub mod employee;
pub mod request;
pub mod role;
pub mod settings;
pub mod shift;
