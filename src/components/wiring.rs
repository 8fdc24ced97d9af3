//! Passive wiring helpers: splitters, pull resistors, constant drivers and
//! readout monitors.

use crate::component::{require_width, BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::{Result, SimError};
use crate::signal::{LogicValue, State};

/// Splits and merges bit groups of one composite state.
///
/// Each input group writes its bits into the composite at its indices; every
/// output group is then re-read from the composite.
#[derive(Debug, Clone)]
pub struct Splitter {
    base: BaseComponent,
    composite: State,
    inputs: Vec<(PortId, Vec<usize>)>,
    outputs: Vec<(PortId, Vec<usize>)>,
}

impl Splitter {
    pub fn new(name: impl Into<String>, width: usize) -> Result<Self> {
        let base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        Ok(Splitter {
            base,
            composite: State::new(width),
            inputs: Vec::new(),
            outputs: Vec::new(),
        })
    }

    fn check_indices(&self, indices: &[usize]) -> Result<()> {
        if indices.is_empty() {
            return Err(SimError::Configuration(format!(
                "splitter '{}' cannot have an empty bit group",
                self.base.name()
            )));
        }
        let width = self.composite.width();
        match indices.iter().find(|index| **index >= width) {
            Some(index) => Err(SimError::IndexOutOfRange {
                index: *index,
                width,
            }),
            None => Ok(()),
        }
    }

    /// Adds input `IN{n}` covering `indices` of the composite.
    pub fn add_input(&mut self, indices: Vec<usize>) -> Result<PortId> {
        self.check_indices(&indices)?;
        let port = self
            .base
            .add_input(format!("IN{}", self.inputs.len()), indices.len());
        self.inputs.push((port, indices));
        Ok(port)
    }

    /// Adds output `OUT{n}` reading `indices` of the composite.
    pub fn add_output(&mut self, indices: Vec<usize>) -> Result<PortId> {
        self.check_indices(&indices)?;
        let port = self
            .base
            .add_output(format!("OUT{}", self.outputs.len()), indices.len());
        self.outputs.push((port, indices));
        Ok(port)
    }

    pub fn composite(&self) -> &State {
        &self.composite
    }

    fn emit(&self, out: &mut Outputs) -> Result<()> {
        for (port, indices) in &self.outputs {
            let bits = indices
                .iter()
                .map(|index| self.composite.get(*index))
                .collect::<Result<Vec<_>>>()?;
            out.drive(*port, State::from_bits(bits));
        }
        Ok(())
    }
}

impl Component for Splitter {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, port: PortId, out: &mut Outputs) -> Result<()> {
        if let Some((_, indices)) = self.inputs.iter().find(|(input, _)| *input == port) {
            let state = self.base.state(port);
            for (bit, index) in state.bits().iter().zip(indices) {
                self.composite.set(*index, *bit)?;
            }
        }
        self.emit(out)
    }
}

/// Replaces Floating bits with a fixed level; other bits pass through. A
/// Floating level makes the resistor transparent.
#[derive(Debug, Clone)]
pub struct PullResistor {
    base: BaseComponent,
    level: LogicValue,
    input: PortId,
    output: PortId,
}

impl PullResistor {
    pub fn new(name: impl Into<String>, width: usize, level: LogicValue) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        let input = base.add_input("I", width);
        let output = base.add_output("O", width);
        Ok(PullResistor {
            base,
            level,
            input,
            output,
        })
    }

    pub fn level(&self) -> LogicValue {
        self.level
    }

    fn resolve(&self) -> State {
        let bits = self
            .base
            .state(self.input)
            .bits()
            .iter()
            .map(|bit| match bit {
                LogicValue::Floating => self.level,
                other => *other,
            })
            .collect();
        State::from_bits(bits)
    }
}

impl Component for PullResistor {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        out.drive(self.output, self.resolve());
        Ok(())
    }

    fn push(&mut self, out: &mut Outputs) -> Result<()> {
        out.drive(self.output, self.resolve());
        Ok(())
    }
}

/// Drives a fixed state on `O` whenever pushed.
#[derive(Debug, Clone)]
pub struct Constant {
    base: BaseComponent,
    value: State,
    output: PortId,
}

impl Constant {
    pub fn new(name: impl Into<String>, value: State) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), value.width())?;
        let output = base.add_output("O", value.width());
        Ok(Constant {
            base,
            value,
            output,
        })
    }

    /// Two's-complement constant.
    pub fn from_int(name: impl Into<String>, value: i64, width: usize) -> Result<Self> {
        Self::new(name, State::from_int(value, width)?)
    }

    pub fn filled(name: impl Into<String>, width: usize, value: LogicValue) -> Result<Self> {
        Self::new(name, State::filled(width, value))
    }

    pub fn value(&self) -> &State {
        &self.value
    }
}

impl Component for Constant {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, _out: &mut Outputs) -> Result<()> {
        Ok(())
    }

    fn push(&mut self, out: &mut Outputs) -> Result<()> {
        out.drive(self.output, self.value.clone());
        Ok(())
    }
}

/// Prints `"<name>: <state>"` to stdout for every state its input sees and
/// keeps the printed lines.
#[derive(Debug, Clone)]
pub struct Readout {
    base: BaseComponent,
    input: PortId,
    history: Vec<String>,
}

impl Readout {
    pub fn new(name: impl Into<String>, width: usize) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        let input = base.add_input("I", width);
        Ok(Readout {
            base,
            input,
            history: Vec::new(),
        })
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn last(&self) -> Option<&str> {
        self.history.last().map(String::as_str)
    }
}

impl Component for Readout {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, _out: &mut Outputs) -> Result<()> {
        let line = format!("{}: {}", self.base.name(), self.base.state(self.input));
        println!("{}", line);
        self.history.push(line);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use LogicValue::*;

    #[test]
    fn test_splitter_regroups_bits() {
        let mut splitter = Splitter::new("split", 4).unwrap();
        splitter.add_input(vec![0, 1]).unwrap();
        splitter.add_input(vec![2, 3]).unwrap();
        splitter.add_output(vec![3, 2, 1, 0]).unwrap();
        splitter.add_output(vec![1]).unwrap();
        assert!(splitter.add_output(vec![4]).is_err());
        assert!(splitter.add_input(Vec::new()).is_err());

        let mut circuit = Circuit::new("split");
        let id = circuit.add(splitter);
        circuit
            .set_input(circuit.port(id, "IN0").unwrap(), State::from_bits(vec![High, Low]))
            .unwrap();
        let reversed = circuit.port(id, "OUT0").unwrap();
        assert_eq!(
            circuit.port_state(reversed).unwrap(),
            &State::from_bits(vec![Floating, Floating, Low, High])
        );

        circuit
            .set_input(circuit.port(id, "IN1").unwrap(), State::from_bits(vec![High, High]))
            .unwrap();
        assert_eq!(
            circuit.port_state(reversed).unwrap(),
            &State::from_bits(vec![High, High, Low, High])
        );
        let single = circuit.port(id, "OUT1").unwrap();
        assert_eq!(circuit.port_state(single).unwrap(), &State::bit(Low));
    }

    #[test]
    fn test_pull_resistor() {
        let mut circuit = Circuit::new("pull");
        let pull = circuit.add(PullResistor::new("pull", 3, High).unwrap());
        circuit
            .set_input(
                circuit.port(pull, "I").unwrap(),
                State::from_bits(vec![Floating, Low, Error]),
            )
            .unwrap();
        assert_eq!(
            circuit.port_state(circuit.port(pull, "O").unwrap()).unwrap(),
            &State::from_bits(vec![High, Low, Error])
        );
    }

    #[test]
    fn test_constant_drives_when_pushed() {
        let mut circuit = Circuit::new("const");
        let constant = circuit.add(Constant::from_int("k", -2, 4).unwrap());
        let bus = circuit.add_bus("k", 4).unwrap();
        circuit.attach(circuit.port(constant, "O").unwrap(), bus).unwrap();
        assert!(circuit.bus_state(bus).unwrap().is_all_floating());
        circuit.push(constant).unwrap();
        assert_eq!(circuit.bus_state(bus).unwrap().to_int().unwrap(), -2);
        // Re-pushing is the same driver, not contention.
        circuit.push(constant).unwrap();
        assert!(!circuit.bus(bus).unwrap().is_contended());
    }

    #[test]
    fn test_readout_renders_states() {
        let mut circuit = Circuit::new("monitor");
        let monitor = circuit.add(Readout::new("monitor", 4).unwrap());
        let input = circuit.port(monitor, "I").unwrap();
        circuit.set_input(input, State::from_int(-3, 4).unwrap()).unwrap();
        circuit.set_input(input, State::new(4)).unwrap();
        circuit.set_input(input, State::error(4)).unwrap();
        let readout = circuit.component::<Readout>(monitor).unwrap();
        assert_eq!(
            readout.history(),
            &["monitor: d = -3 = 1101", "monitor: Undefined", "monitor: Error"]
        );
    }
}
