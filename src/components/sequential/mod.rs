//! Edge-driven state machines. Each element resets first (reset has priority
//! over the clock), then applies its update rule while its clock is active,
//! then re-drives its outputs.

pub mod counter;
pub mod flip_flop;
pub mod register;
pub mod shift_register;

pub use counter::{Counter, OverflowPolicy};
pub use flip_flop::{FlipFlop, FlipFlopKind};
pub use register::Register;
pub use shift_register::ShiftRegister;
