//! Actor-based monitoring scheduler
//!
//! A single [`scheduler::MonitorActor`] owns the ticking loop. Every tick it
//! checks connectivity and fans out one evaluation task per target. Tasks run
//! independently and publish their results as events.
//!
//! ## Architecture Overview
//!
//! ```text
//!            ┌──────────────────┐   commands (mpsc)   ┌───────────────┐
//!            │  MonitorHandle   │ ──────────────────▶ │ MonitorActor  │
//!            └──────────────────┘                     └───────┬───────┘
//!                                                             │ tick
//!                                              connectivity gate
//!                                                             │
//!                         ┌───────────────────┬───────────────┴───┐
//!                         ▼                   ▼                   ▼
//!                  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//!                  │ Evaluate T1 │     │ Evaluate T2 │ ... │ Evaluate Tn │   (TaskGroup)
//!                  │ + dispatch  │     │ + dispatch  │     │ + dispatch  │
//!                  └──────┬──────┘     └──────┬──────┘     └──────┬──────┘
//!                         └───────────────────┼───────────────────┘
//!                                             ▼
//!                                 Broadcast Channel (DecisionEvent)
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: the actor has an mpsc command channel for control messages
//! 2. **Events**: every finished evaluation is published to a broadcast channel
//! 3. **Request/Response**: oneshot channels for synchronous queries

pub mod messages;
pub mod scheduler;
pub mod tasks;
