//! Component library. Every constructor takes explicit widths and edges and
//! returns a [`Component`](crate::component::Component) ready to be added to
//! a [`Circuit`](crate::circuit::Circuit).

pub mod arithmetic;
pub mod clock;
pub mod gates;
pub mod memory;
pub mod routing;
pub mod sequential;
pub mod wiring;

pub use arithmetic::Alu;
pub use clock::Clock;
pub use gates::{Buffer, BufferSetting, ControlledBuffer, Gate, GateKind, NotGate};
pub use memory::{Ram, Rom};
pub use routing::{BitSelector, Demultiplexer, Multiplexer};
pub use sequential::{Counter, FlipFlop, FlipFlopKind, OverflowPolicy, Register, ShiftRegister};
pub use wiring::{Constant, PullResistor, Readout, Splitter};
