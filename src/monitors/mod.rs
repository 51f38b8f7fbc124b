//! Probing and evaluation of monitored targets
//!
//! - [`connectivity`]: gate that decides whether a cycle runs at all
//! - [`actuator`]: health and metrics fetching from Spring Boot Actuator endpoints
//! - [`evaluation`]: turns fetched data into one [`evaluation::AlertDecision`] per target

pub mod actuator;
pub mod connectivity;
pub mod evaluation;
