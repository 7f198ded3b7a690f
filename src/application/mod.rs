// Per-tick fetch, decode and emit
pub mod pipeline;

// Fixed-interval scheduling and lifecycle
pub mod poll_loop;

// Application wiring and shutdown
pub mod system;

pub mod transformer;
