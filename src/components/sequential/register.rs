use crate::component::{require_width, BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::Result;
use crate::port::Edge;
use crate::signal::State;

/// Parallel-load word register.
///
/// Ports: `D` data in, `WE` write enable, `OE` output enable, `R` reset (all
/// level-high), `C` clock, `Q` data out. While `OE` is not High, `Q` is held
/// at all-Low.
#[derive(Debug, Clone)]
pub struct Register {
    base: BaseComponent,
    width: usize,
    stored: State,
    data: PortId,
    write_enable: PortId,
    output_enable: PortId,
    reset: PortId,
    clock: PortId,
    output: PortId,
}

impl Register {
    pub fn new(name: impl Into<String>, width: usize, clock_edge: Edge) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        let data = base.add_input("D", width);
        let write_enable = base.add_trigger("WE", Edge::High);
        let output_enable = base.add_trigger("OE", Edge::High);
        let reset = base.add_trigger("R", Edge::High);
        let clock = base.add_trigger("C", clock_edge);
        let output = base.add_output("Q", width);
        Ok(Register {
            base,
            width,
            stored: State::low(width),
            data,
            write_enable,
            output_enable,
            reset,
            clock,
            output,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn stored(&self) -> &State {
        &self.stored
    }

    fn emit(&self, out: &mut Outputs) {
        let state = if self.base.is_active(self.output_enable) {
            self.stored.clone()
        } else {
            State::low(self.width)
        };
        out.drive(self.output, state);
    }
}

impl Component for Register {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        if self.base.is_active(self.reset) {
            self.stored = State::low(self.width);
        } else if self.base.is_active(self.clock) && self.base.is_active(self.write_enable) {
            self.stored = self.base.state(self.data).clone();
        }
        self.emit(out);
        Ok(())
    }

    fn push(&mut self, out: &mut Outputs) -> Result<()> {
        self.emit(out);
        Ok(())
    }
}
