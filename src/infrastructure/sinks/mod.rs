pub mod fanout;
pub mod loki;
pub mod stdout;

pub use fanout::FanoutSink;
pub use loki::{LokiPusher, LokiSink};
pub use stdout::StdoutSink;
