//! Selection elements: multiplexer, demultiplexer and bit selector.
//!
//! An indeterminate selector wins over data: a Floating selector bit gives
//! all-Floating outputs, otherwise an Error bit gives all-Error outputs.

use crate::component::{require_width, BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::{Result, SimError};
use crate::signal::{LogicValue, State};

/// Widest selector a multiplexer or demultiplexer may declare.
pub const MAX_SELECTOR_WIDTH: usize = 16;

fn check_selector(name: &str, selector_width: usize) -> Result<usize> {
    if selector_width == 0 || selector_width > MAX_SELECTOR_WIDTH {
        return Err(SimError::Configuration(format!(
            "'{}' needs a selector width between 1 and {}, got {}",
            name, MAX_SELECTOR_WIDTH, selector_width
        )));
    }
    Ok(1 << selector_width)
}

/// The selected index, or the fill value for an indeterminate selector.
fn selection(selector: &State) -> std::result::Result<usize, LogicValue> {
    if selector.has_floating() {
        return Err(LogicValue::Floating);
    }
    selector
        .to_unsigned()
        .map(|index| index as usize)
        .map_err(|_| LogicValue::Error)
}

/// Picks input `I{S}` onto `O`.
#[derive(Debug, Clone)]
pub struct Multiplexer {
    base: BaseComponent,
    width: usize,
    selector: PortId,
    inputs: Vec<PortId>,
    output: PortId,
}

impl Multiplexer {
    pub fn new(name: impl Into<String>, selector_width: usize, width: usize) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        let count = check_selector(base.name(), selector_width)?;
        let selector = base.add_input("S", selector_width);
        let inputs = (0..count)
            .map(|i| base.add_input(format!("I{}", i), width))
            .collect();
        let output = base.add_output("O", width);
        Ok(Multiplexer {
            base,
            width,
            selector,
            inputs,
            output,
        })
    }
}

impl Component for Multiplexer {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        let state = match selection(self.base.state(self.selector)) {
            Ok(index) => self.base.state(self.inputs[index]).clone(),
            Err(fill) => State::filled(self.width, fill),
        };
        out.drive(self.output, state);
        Ok(())
    }
}

/// Routes `I` onto output `O{S}`. The other outputs are driven Low, or
/// Floating when the demultiplexer is tri-state.
#[derive(Debug, Clone)]
pub struct Demultiplexer {
    base: BaseComponent,
    width: usize,
    tristate: bool,
    selector: PortId,
    input: PortId,
    outputs: Vec<PortId>,
}

impl Demultiplexer {
    pub fn new(name: impl Into<String>, selector_width: usize, width: usize, tristate: bool) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        let count = check_selector(base.name(), selector_width)?;
        let selector = base.add_input("S", selector_width);
        let input = base.add_input("I", width);
        let outputs = (0..count)
            .map(|i| base.add_output(format!("O{}", i), width))
            .collect();
        Ok(Demultiplexer {
            base,
            width,
            tristate,
            selector,
            input,
            outputs,
        })
    }

    pub fn is_tristate(&self) -> bool {
        self.tristate
    }
}

impl Component for Demultiplexer {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        let idle = if self.tristate {
            State::new(self.width)
        } else {
            State::low(self.width)
        };
        let selected = selection(self.base.state(self.selector));
        for (i, port) in self.outputs.iter().enumerate() {
            let state = match selected {
                Ok(index) if index == i => self.base.state(self.input).clone(),
                Ok(_) => idle.clone(),
                Err(fill) => State::filled(self.width, fill),
            };
            out.drive(*port, state);
        }
        Ok(())
    }
}

/// Drives slice `S` of `I` onto `O`: bits `[S * out_width, (S + 1) * out_width)`.
#[derive(Debug, Clone)]
pub struct BitSelector {
    base: BaseComponent,
    input_width: usize,
    output_width: usize,
    input: PortId,
    selector: PortId,
    output: PortId,
}

impl BitSelector {
    pub fn new(name: impl Into<String>, input_width: usize, output_width: usize) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), input_width)?;
        require_width(base.name(), output_width)?;
        if output_width > input_width {
            return Err(SimError::Configuration(format!(
                "bit selector '{}' cannot select {} bits out of {}",
                base.name(),
                output_width,
                input_width
            )));
        }
        let input = base.add_input("I", input_width);
        let selector = base.add_input("S", Self::selector_width(input_width, output_width));
        let output = base.add_output("O", output_width);
        Ok(BitSelector {
            base,
            input_width,
            output_width,
            input,
            selector,
            output,
        })
    }

    /// Bits needed to number every (possibly partial) slice; at least one.
    pub fn selector_width(input_width: usize, output_width: usize) -> usize {
        let slices = input_width.div_ceil(output_width);
        let mut width = 1;
        while (1usize << width) < slices {
            width += 1;
        }
        width
    }
}

impl Component for BitSelector {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        let state = match selection(self.base.state(self.selector)) {
            Ok(index) => {
                let start = index * self.output_width;
                if start + self.output_width > self.input_width {
                    return Err(SimError::Range {
                        value: index as i128,
                        width: self.input_width,
                    });
                }
                self.base.state(self.input).slice(start, self.output_width)?
            }
            Err(fill) => State::filled(self.output_width, fill),
        };
        out.drive(self.output, state);
        Ok(())
    }
}
