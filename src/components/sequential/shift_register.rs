use crate::component::{require_width, BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::{Result, SimError};
use crate::port::Edge;
use crate::signal::State;

/// Multi-stage shift register with parallel load.
///
/// Ports: `R` reset, `L` load, `S` shift, `C` clock, `SIN` serial in,
/// `IN{i}` / `OUT{i}` per stage. A shift moves `SIN` into stage 0 and stage
/// `i` takes the previous stage `i - 1`.
#[derive(Debug, Clone)]
pub struct ShiftRegister {
    base: BaseComponent,
    width: usize,
    stages: Vec<State>,
    reset: PortId,
    load: PortId,
    shift: PortId,
    clock: PortId,
    serial_in: PortId,
    inputs: Vec<PortId>,
    outputs: Vec<PortId>,
}

impl ShiftRegister {
    pub fn new(name: impl Into<String>, width: usize, stages: usize, clock_edge: Edge) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        if stages == 0 {
            return Err(SimError::Configuration(format!(
                "shift register '{}' needs at least one stage",
                base.name()
            )));
        }
        let clock_edge = clock_edge.require_edge(base.name())?;

        let reset = base.add_trigger("R", Edge::High);
        let load = base.add_input("L", 1);
        let shift = base.add_input("S", 1);
        let clock = base.add_trigger("C", clock_edge);
        let serial_in = base.add_input("SIN", width);
        let inputs = (0..stages)
            .map(|i| base.add_input(format!("IN{}", i), width))
            .collect();
        let outputs = (0..stages)
            .map(|i| base.add_output(format!("OUT{}", i), width))
            .collect();
        Ok(ShiftRegister {
            base,
            width,
            stages: vec![State::low(width); stages],
            reset,
            load,
            shift,
            clock,
            serial_in,
            inputs,
            outputs,
        })
    }

    pub fn stages(&self) -> &[State] {
        &self.stages
    }

    fn emit(&self, out: &mut Outputs) {
        for (port, stage) in self.outputs.iter().zip(&self.stages) {
            out.drive(*port, stage.clone());
        }
    }
}

impl Component for ShiftRegister {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, port: PortId, out: &mut Outputs) -> Result<()> {
        // Data and control inputs are sampled on the next clock.
        if port != self.reset && port != self.clock {
            return Ok(());
        }

        if self.base.is_active(self.reset) {
            self.stages = vec![State::low(self.width); self.stages.len()];
        } else if self.base.is_active(self.clock) {
            if self.base.is_high(self.load) {
                self.stages = self
                    .inputs
                    .iter()
                    .map(|input| self.base.state(*input).clone())
                    .collect();
            } else if self.base.is_high(self.shift) {
                self.stages.pop();
                self.stages.insert(0, self.base.state(self.serial_in).clone());
            }
        }
        self.emit(out);
        Ok(())
    }

    fn push(&mut self, out: &mut Outputs) -> Result<()> {
        self.emit(out);
        Ok(())
    }
}
