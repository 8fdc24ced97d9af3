use crate::component::{require_width, BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::{Result, SimError};
use crate::port::Edge;
use crate::signal::{LogicValue, State, MAX_INT_WIDTH};
use serde::{Deserialize, Serialize};

/// What a counter does when a step would leave `[0, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowPolicy {
    /// Jump to the opposite bound.
    #[default]
    Wrap,
    /// Keep the previous count.
    Stay,
    /// Load the data input.
    Load,
    /// Ignore the maximum; only the width truncates.
    Continue,
}

/// Up/down counter with parallel load.
///
/// Ports: `R` reset, `MS` mode select (High loads `D`), `DS` direction
/// select (Low counts down, otherwise up), `C` clock, `D` load value, `O`
/// count, `OF` overflow.
#[derive(Debug, Clone)]
pub struct Counter {
    base: BaseComponent,
    width: usize,
    max: u64,
    policy: OverflowPolicy,
    count: u64,
    overflowed: bool,
    reset: PortId,
    mode: PortId,
    direction: PortId,
    clock: PortId,
    data: PortId,
    output: PortId,
    overflow: PortId,
}

impl Counter {
    /// `max` defaults to all-ones for the width.
    pub fn new(
        name: impl Into<String>,
        width: usize,
        max: Option<u64>,
        policy: OverflowPolicy,
        clock_edge: Edge,
    ) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        require_width(base.name(), width)?;
        if width > MAX_INT_WIDTH {
            return Err(SimError::Configuration(format!(
                "counter '{}' is {} bits wide, at most {} are supported",
                base.name(),
                width,
                MAX_INT_WIDTH
            )));
        }
        let clock_edge = clock_edge.require_edge(base.name())?;
        let all_ones = Self::mask(width);
        let max = max.unwrap_or(all_ones);
        if max > all_ones {
            return Err(SimError::Range {
                value: max as i128,
                width,
            });
        }

        let reset = base.add_trigger("R", Edge::High);
        let mode = base.add_trigger("MS", Edge::High);
        let direction = base.add_input("DS", 1);
        let clock = base.add_trigger("C", clock_edge);
        let data = base.add_input("D", width);
        let output = base.add_output("O", width);
        let overflow = base.add_output("OF", 1);
        Ok(Counter {
            base,
            width,
            max,
            policy,
            count: 0,
            overflowed: false,
            reset,
            mode,
            direction,
            clock,
            data,
            output,
            overflow,
        })
    }

    fn mask(width: usize) -> u64 {
        if width >= MAX_INT_WIDTH {
            u64::MAX
        } else {
            (1u64 << width) - 1
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn max(&self) -> u64 {
        self.max
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    fn load_value(&self) -> Result<u64> {
        self.base.state(self.data).to_unsigned()
    }

    fn counts_up(&self) -> Result<bool> {
        match self.base.value(self.direction) {
            LogicValue::Low => Ok(false),
            LogicValue::High | LogicValue::Floating => Ok(true),
            LogicValue::Error => Err(SimError::IndeterminateState),
        }
    }

    fn clocked_update(&mut self) -> Result<()> {
        if self.base.is_active(self.mode) {
            self.count = self.load_value()?;
            self.overflowed = false;
            return Ok(());
        }

        let up = self.counts_up()?;
        let crossed = if up {
            self.count >= self.max
        } else {
            self.count == 0
        };
        self.overflowed = crossed;
        if !crossed {
            self.count = if up { self.count + 1 } else { self.count - 1 };
            return Ok(());
        }

        self.count = match self.policy {
            OverflowPolicy::Wrap if up => 0,
            OverflowPolicy::Wrap => self.max,
            OverflowPolicy::Stay => self.count,
            OverflowPolicy::Load => self.load_value()?,
            OverflowPolicy::Continue if up => self.count.wrapping_add(1) & Self::mask(self.width),
            OverflowPolicy::Continue => self.count.wrapping_sub(1) & Self::mask(self.width),
        };
        Ok(())
    }

    fn emit(&self, out: &mut Outputs) -> Result<()> {
        out.drive(self.output, State::from_unsigned(self.count, self.width)?);
        out.drive(self.overflow, State::bit(LogicValue::from_bool(self.overflowed)));
        Ok(())
    }
}

impl Component for Counter {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        if self.base.is_active(self.reset) {
            self.count = 0;
            self.overflowed = false;
        } else if self.base.is_active(self.clock) {
            self.clocked_update()?;
        }
        self.emit(out)
    }

    fn push(&mut self, out: &mut Outputs) -> Result<()> {
        self.emit(out)
    }
}
