//! # Rusty Logic
//!
//! A gate-level digital circuit simulator.
//!
//! This library provides:
//! - Four-valued signal states (Floating, Low, High, Error) of fixed width
//! - Width-checked ports and buses with driver contention
//! - Synchronous, depth-guarded propagation with atomic rollback
//! - Gates, flip-flops, registers, counters, shift registers, memories, an
//!   ALU and routing elements
//! - JSON circuit descriptions and non-volatile RAM persistence

pub mod bus;
pub mod circuit;
pub mod component;
pub mod components;
pub mod connection;
pub mod error;
pub mod persistence;
pub mod port;
pub mod signal;
pub mod system_config;

// Re-export commonly used items for easier importing
pub use circuit::{Circuit, CircuitInfo, DEFAULT_MAX_DEPTH};
pub use component::{BaseComponent, Component, Outputs};
pub use connection::{BusId, ComponentId, PortId, PortRef};
pub use error::{Result, SimError};
pub use port::Edge;
pub use signal::{LogicValue, State};
