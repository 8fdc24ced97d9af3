//! Combinational gates. Every gate recomputes its whole output on any input
//! change, bit by bit.

use crate::component::{require_width, BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::Result;
use crate::signal::{LogicValue, State};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct NotGate {
    base: BaseComponent,
    input: PortId,
    output: PortId,
}

impl NotGate {
    pub fn new(name: impl Into<String>, width: usize) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        let input = base.add_input("I", width);
        let output = base.add_output("O", width);
        Ok(NotGate {
            base,
            input,
            output,
        })
    }
}

impl Component for NotGate {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        let bits = self.base.state(self.input).bits().iter().map(|bit| !*bit).collect();
        out.drive(self.output, State::from_bits(bits));
        Ok(())
    }
}

/// Which definite level a [`Buffer`] lets through; the other becomes Floating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferSetting {
    #[default]
    LowHigh,
    /// Open-drain style: Low passes, High floats.
    LowFloating,
    /// Open-source style: High passes, Low floats.
    FloatingHigh,
}

impl BufferSetting {
    fn map(&self, value: LogicValue) -> LogicValue {
        match (self, value) {
            (BufferSetting::LowFloating, LogicValue::High) => LogicValue::Floating,
            (BufferSetting::FloatingHigh, LogicValue::Low) => LogicValue::Floating,
            _ => value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Buffer {
    base: BaseComponent,
    setting: BufferSetting,
    input: PortId,
    output: PortId,
}

impl Buffer {
    pub fn new(name: impl Into<String>, width: usize, setting: BufferSetting) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        let input = base.add_input("I", width);
        let output = base.add_output("O", width);
        Ok(Buffer {
            base,
            setting,
            input,
            output,
        })
    }

    pub fn setting(&self) -> BufferSetting {
        self.setting
    }
}

impl Component for Buffer {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        let bits = self
            .base
            .state(self.input)
            .bits()
            .iter()
            .map(|bit| self.setting.map(*bit))
            .collect();
        out.drive(self.output, State::from_bits(bits));
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateKind {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
}

impl GateKind {
    /// Output for one bit position given that position across all inputs.
    /// Any Floating or Error input makes the result Error.
    pub fn evaluate(&self, inputs: &[LogicValue]) -> LogicValue {
        if inputs.iter().any(|value| !value.is_definite()) {
            return LogicValue::Error;
        }
        let highs = inputs.iter().filter(|value| **value == LogicValue::High).count();
        let result = match self {
            GateKind::And | GateKind::Nand => highs == inputs.len(),
            GateKind::Or | GateKind::Nor => highs > 0,
            GateKind::Xor | GateKind::Xnor => highs == 1,
        };
        let value = LogicValue::from_bool(result);
        match self {
            GateKind::Nand | GateKind::Nor | GateKind::Xnor => !value,
            _ => value,
        }
    }
}

/// An n-input gate. Inputs are named `I0`, `I1`, ... in creation order.
#[derive(Debug, Clone)]
pub struct Gate {
    base: BaseComponent,
    kind: GateKind,
    width: usize,
    inputs: Vec<PortId>,
    output: PortId,
}

impl Gate {
    pub fn new(name: impl Into<String>, kind: GateKind, width: usize, inputs: usize) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        let output = base.add_output("O", width);
        let mut gate = Gate {
            base,
            kind,
            width,
            inputs: Vec::new(),
            output,
        };
        for _ in 0..inputs {
            gate.add_input();
        }
        Ok(gate)
    }

    /// Adds one more input; call before the gate is placed in a circuit.
    pub fn add_input(&mut self) -> PortId {
        let name = format!("I{}", self.inputs.len());
        let port = self.base.add_input(name, self.width);
        self.inputs.push(port);
        port
    }

    pub fn kind(&self) -> GateKind {
        self.kind
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }
}

impl Component for Gate {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        let mut column = Vec::with_capacity(self.inputs.len());
        let bits = (0..self.width)
            .map(|i| {
                column.clear();
                column.extend(
                    self.inputs
                        .iter()
                        .map(|input| self.base.state(*input).bits()[i]),
                );
                self.kind.evaluate(&column)
            })
            .collect();
        out.drive(self.output, State::from_bits(bits));
        Ok(())
    }
}

/// Tri-state buffer: passes its input while `E` is High, floats while `E` is
/// Low, and drives Error when `E` is indeterminate.
#[derive(Debug, Clone)]
pub struct ControlledBuffer {
    base: BaseComponent,
    width: usize,
    stored: State,
    input: PortId,
    enable: PortId,
    output: PortId,
}

impl ControlledBuffer {
    pub fn new(name: impl Into<String>, width: usize) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        let input = base.add_input("I", width);
        let enable = base.add_input("E", 1);
        let output = base.add_output("O", width);
        Ok(ControlledBuffer {
            base,
            width,
            stored: State::new(width),
            input,
            enable,
            output,
        })
    }
}

impl Component for ControlledBuffer {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, port: PortId, out: &mut Outputs) -> Result<()> {
        let enable = self.base.value(self.enable);
        if port == self.input {
            let bits = self
                .base
                .state(self.input)
                .bits()
                .iter()
                .map(|bit| if bit.is_definite() { *bit } else { LogicValue::Error })
                .collect();
            self.stored = State::from_bits(bits);
            if enable == LogicValue::High {
                out.drive(self.output, self.stored.clone());
            }
            return Ok(());
        }

        let state = match enable {
            LogicValue::High => self.stored.clone(),
            LogicValue::Low => State::new(self.width),
            LogicValue::Floating | LogicValue::Error => State::error(self.width),
        };
        out.drive(self.output, state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use LogicValue::*;

    fn bits(values: &[LogicValue]) -> State {
        State::from_bits(values.to_vec())
    }

    #[test]
    fn test_not_gate_per_bit() {
        let mut circuit = Circuit::new("not");
        let gate = circuit.add(NotGate::new("not", 4).unwrap());
        let input = circuit.port(gate, "I").unwrap();
        let output = circuit.port(gate, "O").unwrap();
        circuit
            .set_input(input, bits(&[Low, High, Floating, Error]))
            .unwrap();
        assert_eq!(
            circuit.port_state(output).unwrap(),
            &bits(&[High, Low, Error, Error])
        );
    }

    #[test]
    fn test_buffer_settings() {
        assert_eq!(BufferSetting::LowHigh.map(High), High);
        assert_eq!(BufferSetting::LowFloating.map(High), Floating);
        assert_eq!(BufferSetting::LowFloating.map(Low), Low);
        assert_eq!(BufferSetting::FloatingHigh.map(Low), Floating);
        assert_eq!(BufferSetting::FloatingHigh.map(Error), Error);

        let mut circuit = Circuit::new("buffer");
        let buffer = circuit.add(Buffer::new("buf", 3, BufferSetting::LowFloating).unwrap());
        circuit
            .set_input(circuit.port(buffer, "I").unwrap(), bits(&[Low, High, Floating]))
            .unwrap();
        assert_eq!(
            circuit.port_state(circuit.port(buffer, "O").unwrap()).unwrap(),
            &bits(&[Low, Floating, Floating])
        );
    }

    #[test]
    fn test_truth_tables() {
        use GateKind::*;
        assert_eq!(And.evaluate(&[High, High, High]), High);
        assert_eq!(And.evaluate(&[High, Low, High]), Low);
        assert_eq!(And.evaluate(&[Floating, High, High]), Error);
        assert_eq!(Nand.evaluate(&[High, High]), Low);
        assert_eq!(Nand.evaluate(&[Error, High]), Error);
        assert_eq!(Or.evaluate(&[Low, Low]), Low);
        assert_eq!(Or.evaluate(&[Low, High]), High);
        assert_eq!(Or.evaluate(&[Low, Floating]), Error);
        assert_eq!(Nor.evaluate(&[Low, Low]), High);
        assert_eq!(Xor.evaluate(&[High, Low, Low]), High);
        assert_eq!(Xor.evaluate(&[High, High, Low]), Low);
        assert_eq!(Xnor.evaluate(&[High, High]), High);
        assert_eq!(Xnor.evaluate(&[High, Low]), Low);
    }

    #[test]
    fn test_three_input_and() {
        let mut circuit = Circuit::new("and");
        let mut gate = Gate::new("and", GateKind::And, 1, 2).unwrap();
        gate.add_input();
        assert_eq!(gate.input_count(), 3);
        let gate = circuit.add(gate);
        let inputs: Vec<_> = ["I0", "I1", "I2"]
            .iter()
            .map(|name| circuit.port(gate, name).unwrap())
            .collect();
        let output = circuit.port(gate, "O").unwrap();

        for input in &inputs {
            circuit.set_input(*input, State::bit(High)).unwrap();
        }
        assert_eq!(circuit.port_state(output).unwrap(), &State::bit(High));

        circuit.set_input(inputs[1], State::bit(Low)).unwrap();
        assert_eq!(circuit.port_state(output).unwrap(), &State::bit(Low));

        circuit.set_input(inputs[1], State::bit(High)).unwrap();
        circuit.set_input(inputs[0], State::bit(Floating)).unwrap();
        assert_eq!(circuit.port_state(output).unwrap(), &State::bit(Error));
    }

    #[test]
    fn test_controlled_buffer() {
        let mut circuit = Circuit::new("tristate");
        let buffer = circuit.add(ControlledBuffer::new("tri", 2).unwrap());
        let input = circuit.port(buffer, "I").unwrap();
        let enable = circuit.port(buffer, "E").unwrap();
        let output = circuit.port(buffer, "O").unwrap();

        circuit.set_input(input, bits(&[High, Low])).unwrap();
        assert!(circuit.port_state(output).unwrap().is_all_floating());

        circuit.set_input(enable, State::bit(High)).unwrap();
        assert_eq!(circuit.port_state(output).unwrap(), &bits(&[High, Low]));

        circuit.set_input(enable, State::bit(Low)).unwrap();
        assert!(circuit.port_state(output).unwrap().is_all_floating());

        circuit.set_input(enable, State::bit(Error)).unwrap();
        assert_eq!(circuit.port_state(output).unwrap(), &State::error(2));
    }

    #[test]
    fn test_zero_width_rejected() {
        assert!(Gate::new("g", GateKind::Or, 0, 2).is_err());
        assert!(NotGate::new("n", 0).is_err());
    }
}
