//! Width-aware adder/subtractor.

use crate::component::{require_width, BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::{Result, SimError};
use crate::signal::{LogicValue, State, MAX_INT_WIDTH};

pub const MODE_WIDTH: usize = 2;
pub const MODE_ADD: u64 = 0;
pub const MODE_SUB: u64 = 1;

/// Arithmetic unit.
///
/// Ports: `A`, `B` operands, `CIN` carry (or borrow) in, `M` mode, `OUT`
/// result, `COUT` carry (or borrow) out. Mode 0 adds, mode 1 subtracts;
/// other modes fail with [`SimError::UnsupportedMode`]. Any indeterminate
/// input makes both outputs Error.
#[derive(Debug, Clone)]
pub struct Alu {
    base: BaseComponent,
    width: usize,
    a: PortId,
    b: PortId,
    carry_in: PortId,
    mode: PortId,
    output: PortId,
    carry_out: PortId,
}

impl Alu {
    pub fn new(name: impl Into<String>, width: usize) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        if width > MAX_INT_WIDTH {
            return Err(SimError::Configuration(format!(
                "ALU '{}' is {} bits wide, at most {} are supported",
                base.name(),
                width,
                MAX_INT_WIDTH
            )));
        }
        let a = base.add_input("A", width);
        let b = base.add_input("B", width);
        let carry_in = base.add_input("CIN", 1);
        let mode = base.add_input("M", MODE_WIDTH);
        let output = base.add_output("OUT", width);
        let carry_out = base.add_output("COUT", 1);
        Ok(Alu {
            base,
            width,
            a,
            b,
            carry_in,
            mode,
            output,
            carry_out,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Result and carry-out of `mode` applied to definite operands.
    pub fn compute(&self, mode: u64, a: u64, b: u64, carry: bool) -> Result<(u64, bool)> {
        let modulus = 1u128 << self.width;
        let (a, b, carry) = (a as u128, b as u128, carry as u128);
        match mode {
            MODE_ADD => {
                let sum = a + b + carry;
                Ok(((sum % modulus) as u64, sum >= modulus))
            }
            MODE_SUB => {
                let subtrahend = b + carry;
                let difference = (a + modulus * 2 - subtrahend) % modulus;
                Ok((difference as u64, subtrahend > a))
            }
            other => Err(SimError::UnsupportedMode(other)),
        }
    }
}

impl Component for Alu {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        let inputs = [self.a, self.b, self.carry_in, self.mode];
        if inputs.iter().any(|port| !self.base.state(*port).is_definite()) {
            out.drive(self.output, State::error(self.width));
            out.drive(self.carry_out, State::error(1));
            return Ok(());
        }

        let mode = self.base.state(self.mode).to_unsigned()?;
        let a = self.base.state(self.a).to_unsigned()?;
        let b = self.base.state(self.b).to_unsigned()?;
        let carry = self.base.value(self.carry_in).to_bool()?;
        let (result, carry_out) = self.compute(mode, a, b, carry)?;
        out.drive(self.output, State::from_unsigned(result, self.width)?);
        out.drive(self.carry_out, State::bit(LogicValue::from_bool(carry_out)));
        Ok(())
    }
}
