use crate::connection::{check_widths, Endpoint, PortRef};
use crate::error::Result;
use crate::signal::State;
use std::fmt;

/// Who asserted the bus's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Driver {
    Port(PortRef),
    /// Stimulus applied from outside the circuit.
    External,
}

/// What a write did to the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusWrite {
    /// The state was overwritten by its (new or current) driver.
    Driven,
    /// A second driver asserted a driven bus; every bit is now Error.
    Contention,
    /// A non-driving port wrote all-Floating; nothing changed.
    Ignored,
}

/// A shared carrier: any attached output may overwrite its state and every
/// listener is notified, in attachment order, of each overwrite.
#[derive(Debug, Clone)]
pub struct Bus {
    name: String,
    width: usize,
    state: State,
    driver: Option<Driver>,
    contended: bool,
    listeners: Vec<PortRef>,
    drivers: Vec<PortRef>,
}

impl Bus {
    pub fn new(name: impl Into<String>, width: usize) -> Self {
        Bus {
            name: name.into(),
            width,
            state: State::new(width),
            driver: None,
            contended: false,
            listeners: Vec::new(),
            drivers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn driver(&self) -> Option<Driver> {
        self.driver
    }

    pub fn is_contended(&self) -> bool {
        self.contended
    }

    pub fn listeners(&self) -> &[PortRef] {
        &self.listeners
    }

    pub(crate) fn add_listener(&mut self, port: PortRef) {
        self.listeners.push(port);
    }

    pub(crate) fn add_driver(&mut self, port: PortRef) {
        self.drivers.push(port);
    }

    /// Applies one driver's state.
    ///
    /// The bus is overwritten when it is undriven or when the write comes
    /// from its current driver. Any other driver asserting it collapses every
    /// bit to Error, and the bus stays in error until [`Bus::release`].
    pub fn write(&mut self, driver: Driver, state: State) -> Result<BusWrite> {
        check_widths(
            &Endpoint::new(&self.name, self.width),
            &Endpoint::new("written state", state.width()),
        )?;

        if self.contended {
            return Ok(BusWrite::Contention);
        }

        let owned = self.driver == Some(driver);
        if owned || self.state.is_all_floating() {
            self.driver = if state.is_all_floating() {
                None
            } else {
                Some(driver)
            };
            self.state = state;
            return Ok(BusWrite::Driven);
        }

        if state.is_all_floating() {
            return Ok(BusWrite::Ignored);
        }

        self.contended = true;
        self.state = State::error(self.width);
        Ok(BusWrite::Contention)
    }

    /// Drops every driver and returns the bus to all-Floating.
    pub fn release(&mut self) {
        self.state = State::new(self.width);
        self.driver = None;
        self.contended = false;
    }
}

impl fmt::Display for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.name, self.width, self.state)?;
        if self.contended {
            write!(f, " (contention, {} attached drivers)", self.drivers.len())?;
        }
        Ok(())
    }
}
