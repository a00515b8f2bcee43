pub mod port;
pub mod throttled;
