pub mod core;
pub mod mock;
pub mod observability;
pub mod sinks;

pub use self::core::HttpClientFactory;
