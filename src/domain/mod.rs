pub mod aircraft;
pub mod errors;
pub mod flexible;
pub mod log_event;
pub mod ports;
