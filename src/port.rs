//! # Ports
//!
//! A [`Port`] is a fixed-width connection point owned by one component.
//! Inputs accept pushed states and wake their component, outputs drive the
//! bus they are attached to, and triggers are single-bit inputs that sense
//! an edge or a sustained level.

use crate::connection::BusId;
use crate::error::{Result, SimError};
use crate::signal::{LogicValue, State};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Rising,
    Falling,
    High,
    Low,
}

impl Edge {
    /// Level conditions hold continuously rather than firing once.
    pub fn is_level(&self) -> bool {
        matches!(self, Edge::High | Edge::Low)
    }

    /// Whether `previous -> current` is a qualifying transition. Edges are
    /// strict: Rising is Low to High and Falling is High to Low.
    pub fn fires(&self, previous: LogicValue, current: LogicValue) -> bool {
        match self {
            Edge::Rising => previous == LogicValue::Low && current == LogicValue::High,
            Edge::Falling => previous == LogicValue::High && current == LogicValue::Low,
            Edge::High => current == LogicValue::High,
            Edge::Low => current == LogicValue::Low,
        }
    }

    /// Rejects level conditions for elements that need a genuine edge.
    pub fn require_edge(self, element: &str) -> Result<Edge> {
        if self.is_level() {
            return Err(SimError::Configuration(format!(
                "{} needs a rising or falling clock edge, got {:?}",
                element, self
            )));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
    Trigger(Edge),
}

#[derive(Debug, Clone)]
pub struct Port {
    name: String,
    width: usize,
    direction: Direction,
    state: State,
    bus: Option<BusId>,
    firing: bool,
}

impl Port {
    pub fn new(name: impl Into<String>, width: usize, direction: Direction) -> Self {
        Port {
            name: name.into(),
            width,
            direction,
            state: State::new(width),
            bus: None,
            firing: false,
        }
    }

    pub fn input(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, width, Direction::Input)
    }

    pub fn output(name: impl Into<String>, width: usize) -> Self {
        Self::new(name, width, Direction::Output)
    }

    pub fn trigger(name: impl Into<String>, edge: Edge) -> Self {
        Self::new(name, 1, Direction::Trigger(edge))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_output(&self) -> bool {
        self.direction == Direction::Output
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn bus(&self) -> Option<BusId> {
        self.bus
    }

    pub(crate) fn set_bus(&mut self, bus: BusId) {
        self.bus = Some(bus);
    }

    /// Stores a new state and reports whether the component should react.
    ///
    /// Plain inputs and level triggers react to every push. Edge triggers
    /// react only on a qualifying transition, and are marked as firing until
    /// [`Port::finish_firing`] is called.
    pub(crate) fn accept(&mut self, state: State) -> bool {
        let previous = self.state.lsb();
        self.state = state;
        match self.direction {
            Direction::Input | Direction::Output => true,
            Direction::Trigger(edge) if edge.is_level() => true,
            Direction::Trigger(edge) => {
                self.firing = edge.fires(previous, self.state.lsb());
                self.firing
            }
        }
    }

    pub(crate) fn finish_firing(&mut self) {
        self.firing = false;
    }

    pub(crate) fn store(&mut self, state: State) {
        self.state = state;
    }

    /// Level triggers track the live line; edge triggers are active only
    /// while the reaction to their edge is running. Other ports read High.
    pub fn is_active(&self) -> bool {
        match self.direction {
            Direction::Trigger(Edge::Rising | Edge::Falling) => self.firing,
            Direction::Trigger(edge) => edge.fires(LogicValue::Floating, self.state.lsb()),
            Direction::Input | Direction::Output => self.state.lsb() == LogicValue::High,
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.name, self.width, self.state)
    }
}
