// # Reporter Implementations
//
// This module provides implementations of the Reporter trait for
// different report sinks.

pub mod channel;
pub mod logging;

pub use channel::ChannelReporter;
pub use logging::TracingReporter;
