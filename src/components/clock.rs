//! Logical-time clock generator.

use crate::component::{BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::{Result, SimError};
use crate::port::Edge;
use crate::signal::{LogicValue, State};
use log::debug;

/// Square-wave source on `CLK`, advanced by [`Circuit::step`].
///
/// A rising edge on `START` (or [`Clock::start`]) drives `CLK` Low and starts
/// counting ticks; `CLK` then stays Low for `low_ticks` and High for
/// `high_ticks`, repeatedly. A rising edge on `STOP` (or [`Clock::stop`])
/// freezes the output at its current level.
///
/// [`Circuit::step`]: crate::circuit::Circuit::step
#[derive(Debug, Clone)]
pub struct Clock {
    base: BaseComponent,
    high_ticks: u64,
    low_ticks: u64,
    running: bool,
    level: LogicValue,
    elapsed: u64,
    cycles: u64,
    start: PortId,
    stop: PortId,
    output: PortId,
}

impl Clock {
    /// A symmetric clock toggling every `half_period` ticks.
    pub fn new(name: impl Into<String>, half_period: u64) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        if half_period == 0 {
            return Err(SimError::Configuration(format!(
                "clock '{}' needs a half period of at least one tick",
                base.name()
            )));
        }
        let start = base.add_trigger("START", Edge::Rising);
        let stop = base.add_trigger("STOP", Edge::Rising);
        let output = base.add_output("CLK", 1);
        Ok(Clock {
            base,
            high_ticks: half_period,
            low_ticks: half_period,
            running: false,
            level: LogicValue::Low,
            elapsed: 0,
            cycles: 0,
            start,
            stop,
            output,
        })
    }

    /// Sets an asymmetric duty cycle in ticks per level.
    pub fn set_duty(&mut self, high_ticks: u64, low_ticks: u64) -> Result<()> {
        if high_ticks == 0 || low_ticks == 0 {
            return Err(SimError::Configuration(format!(
                "clock '{}' needs at least one tick per level",
                self.base.name()
            )));
        }
        self.high_ticks = high_ticks;
        self.low_ticks = low_ticks;
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn level(&self) -> LogicValue {
        self.level
    }

    /// Completed Low-to-High transitions since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn start(&mut self, out: &mut Outputs) {
        debug!("{}: started", self.base.name());
        self.running = true;
        self.level = LogicValue::Low;
        self.elapsed = 0;
        out.drive(self.output, State::bit(self.level));
    }

    pub fn stop(&mut self) {
        debug!("{}: stopped after {} cycles", self.base.name(), self.cycles);
        self.running = false;
    }

    fn current_span(&self) -> u64 {
        if self.level == LogicValue::High {
            self.high_ticks
        } else {
            self.low_ticks
        }
    }
}

impl Component for Clock {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        if self.base.is_active(self.stop) {
            self.stop();
        } else if self.base.is_active(self.start) {
            self.start(out);
        }
        Ok(())
    }

    fn push(&mut self, out: &mut Outputs) -> Result<()> {
        if self.running {
            out.drive(self.output, State::bit(self.level));
        }
        Ok(())
    }

    fn tick(&mut self, out: &mut Outputs) -> Result<()> {
        self.elapsed += 1;
        if self.elapsed < self.current_span() {
            return Ok(());
        }
        self.elapsed = 0;
        self.level = !self.level;
        if self.level == LogicValue::High {
            self.cycles += 1;
        }
        out.drive(self.output, State::bit(self.level));
        Ok(())
    }

    fn is_timed(&self) -> bool {
        self.running
    }
}
