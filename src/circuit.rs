//! # Circuit topology and propagation engine
//!
//! A [`Circuit`] owns every component and bus of one simulation. Writing a
//! bus synchronously delivers the new state to each listener in attachment
//! order; a listener's reaction may drive further buses, so one stimulus
//! produces a depth-first propagation wave that has fully settled when the
//! call returns. The wave is driven from an explicit work stack rather than
//! the call stack, so its depth is bounded only by the depth limit. An
//! output re-asserting the state it already drives on its own bus does not
//! write the bus again, so feedback through a register settles instead of
//! recursing.
//!
//! Every top-level operation is atomic: if any reaction in the wave fails,
//! all buses and components touched by it are restored before the error is
//! returned. RAM images queued for persistence are written only once the
//! operation has succeeded. Combinational loops are caught by a propagation
//! depth limit and reported as [`SimError::CycleDetected`].

use crate::bus::{Bus, BusWrite, Driver};
use crate::component::{require_width, Component, Outputs, PendingStore};
use crate::connection::{check_widths, BusId, ComponentId, Endpoint, PortId, PortRef};
use crate::error::{Result, SimError};
use crate::port::Direction;
use crate::signal::{LogicValue, State};
use log::{debug, error, trace, warn};
use std::collections::HashMap;

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Summary of a circuit for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitInfo {
    pub name: String,
    pub component_count: usize,
    pub bus_count: usize,
    pub time: u64,
}

/// Pre-images of everything a transaction has touched, and the RAM images
/// to persist once it commits.
struct Journal {
    time: u64,
    components: HashMap<usize, Box<dyn Component>>,
    buses: HashMap<usize, Bus>,
    stores: Vec<PendingStore>,
}

/// Work left in a propagation wave.
enum Pending {
    /// Write `state` onto `bus` on behalf of `driver`.
    Write {
        bus: BusId,
        driver: Driver,
        state: State,
        depth: usize,
    },
    /// Store `state` on an output port and drive its bus.
    Output {
        port: PortRef,
        state: State,
        depth: usize,
    },
    /// Hand `state` to an input or trigger and let its component react.
    Deliver {
        target: PortRef,
        state: State,
        depth: usize,
    },
}

pub struct Circuit {
    name: String,
    components: Vec<Box<dyn Component>>,
    buses: Vec<Bus>,
    max_depth: usize,
    time: u64,
    journal: Option<Journal>,
}

impl Circuit {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_max_depth(name, DEFAULT_MAX_DEPTH)
    }

    pub fn with_max_depth(name: impl Into<String>, max_depth: usize) -> Self {
        Circuit {
            name: name.into(),
            components: Vec::new(),
            buses: Vec::new(),
            max_depth,
            time: 0,
            journal: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Logical time: the number of ticks stepped so far.
    pub fn time(&self) -> u64 {
        self.time
    }

    pub fn info(&self) -> CircuitInfo {
        CircuitInfo {
            name: self.name.clone(),
            component_count: self.components.len(),
            bus_count: self.buses.len(),
            time: self.time,
        }
    }

    // ---- construction ----

    pub fn add<C: Component + 'static>(&mut self, component: C) -> ComponentId {
        self.add_boxed(Box::new(component))
    }

    pub fn add_boxed(&mut self, component: Box<dyn Component>) -> ComponentId {
        debug!(
            "{}: adding component '{}' with {} ports",
            self.name,
            component.name(),
            component.base().ports().len()
        );
        self.components.push(component);
        ComponentId(self.components.len() - 1)
    }

    pub fn add_bus(&mut self, name: impl Into<String>, width: usize) -> Result<BusId> {
        let name = name.into();
        require_width(&name, width)?;
        debug!("{}: adding bus '{}' ({} bits)", self.name, name, width);
        self.buses.push(Bus::new(name, width));
        Ok(BusId(self.buses.len() - 1))
    }

    /// Looks a port up by name.
    pub fn port(&self, component: ComponentId, name: &str) -> Result<PortRef> {
        let port = self.get_component(component)?.base().find_port(name)?;
        Ok(PortRef::new(component, port))
    }

    /// Attaches a port to a bus. Outputs become potential drivers, inputs and
    /// triggers become listeners in attachment order. Widths must match.
    pub fn attach(&mut self, port: PortRef, bus: BusId) -> Result<()> {
        let (port_name, width, direction, attached) = {
            let component = self.get_component(port.component)?;
            let base = component.base();
            let target = base.get_port(port.port).ok_or_else(|| SimError::UnknownPort {
                component: base.name().to_string(),
                port: format!("#{}", port.port.index()),
            })?;
            (
                base.qualified_name(port.port),
                target.width(),
                target.direction(),
                target.bus().is_some(),
            )
        };
        let carrier = self.buses.get(bus.0).ok_or(SimError::UnknownBus(bus.0))?;
        check_widths(
            &Endpoint::new(&port_name, width),
            &Endpoint::new(carrier.name(), carrier.width()),
        )?;
        if attached {
            return Err(SimError::AlreadyAttached(port_name));
        }

        if let Some(target) = self.components[port.component.0]
            .base_mut()
            .get_port_mut(port.port)
        {
            target.set_bus(bus);
        }
        let carrier = &mut self.buses[bus.0];
        match direction {
            Direction::Output => carrier.add_driver(port),
            Direction::Input | Direction::Trigger(_) => carrier.add_listener(port),
        }
        debug!("{}: attached {} to bus '{}'", self.name, port_name, carrier.name());
        Ok(())
    }

    /// Wires `from` to `to`, reusing the bus `from` already drives or creating
    /// one named after it.
    pub fn connect(&mut self, from: PortRef, to: PortRef) -> Result<BusId> {
        let (from_name, from_width, from_bus) = self.describe_port(from)?;
        let (to_name, to_width, _) = self.describe_port(to)?;
        check_widths(
            &Endpoint::new(&from_name, from_width),
            &Endpoint::new(&to_name, to_width),
        )?;

        let bus = match from_bus {
            Some(bus) => bus,
            None => {
                let bus = self.add_bus(from_name, from_width)?;
                self.attach(from, bus)?;
                bus
            }
        };
        self.attach(to, bus)?;
        Ok(bus)
    }

    fn describe_port(&self, port: PortRef) -> Result<(String, usize, Option<BusId>)> {
        let base = self.get_component(port.component)?.base();
        let target = base.get_port(port.port).ok_or_else(|| SimError::UnknownPort {
            component: base.name().to_string(),
            port: format!("#{}", port.port.index()),
        })?;
        Ok((base.qualified_name(port.port), target.width(), target.bus()))
    }

    // ---- inspection ----

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn bus_count(&self) -> usize {
        self.buses.len()
    }

    pub fn get_component(&self, id: ComponentId) -> Result<&dyn Component> {
        self.components
            .get(id.0)
            .map(|component| component.as_ref())
            .ok_or(SimError::UnknownComponent(id.0))
    }

    /// Typed view of a component, if `id` holds a `T`.
    pub fn component<T: Component + 'static>(&self, id: ComponentId) -> Option<&T> {
        self.components
            .get(id.0)
            .and_then(|component| component.as_any().downcast_ref::<T>())
    }

    pub fn find_component(&self, name: &str) -> Option<ComponentId> {
        self.components
            .iter()
            .position(|component| component.name() == name)
            .map(ComponentId)
    }

    pub fn bus(&self, id: BusId) -> Result<&Bus> {
        self.buses.get(id.0).ok_or(SimError::UnknownBus(id.0))
    }

    pub fn buses(&self) -> impl Iterator<Item = (BusId, &Bus)> {
        self.buses.iter().enumerate().map(|(i, bus)| (BusId(i), bus))
    }

    pub fn find_bus(&self, name: &str) -> Option<BusId> {
        self.buses.iter().position(|bus| bus.name() == name).map(BusId)
    }

    pub fn bus_state(&self, id: BusId) -> Result<&State> {
        Ok(self.bus(id)?.state())
    }

    pub fn port_state(&self, port: PortRef) -> Result<&State> {
        let base = self.get_component(port.component)?.base();
        base.get_port(port.port)
            .map(|target| target.state())
            .ok_or_else(|| SimError::UnknownPort {
                component: base.name().to_string(),
                port: format!("#{}", port.port.index()),
            })
    }

    // ---- stimulus ----

    /// Drives a bus from outside the circuit.
    pub fn drive(&mut self, bus: BusId, state: State) -> Result<()> {
        self.transaction(|circuit| {
            circuit.propagate(vec![Pending::Write {
                bus,
                driver: Driver::External,
                state,
                depth: 0,
            }])
        })
    }

    pub fn drive_bit(&mut self, bus: BusId, value: LogicValue) -> Result<()> {
        self.drive(bus, State::bit(value))
    }

    /// Pushes a state straight into an input or trigger port.
    pub fn set_input(&mut self, port: PortRef, state: State) -> Result<()> {
        self.transaction(|circuit| {
            circuit.propagate(vec![Pending::Deliver {
                target: port,
                state,
                depth: 1,
            }])
        })
    }

    /// Returns a bus to all-Floating, clearing contention, and notifies its
    /// listeners.
    pub fn release(&mut self, bus: BusId) -> Result<()> {
        self.transaction(|circuit| {
            circuit.remember_bus(bus.0);
            let carrier = circuit
                .buses
                .get_mut(bus.0)
                .ok_or(SimError::UnknownBus(bus.0))?;
            carrier.release();
            debug!("released bus '{}'", carrier.name());
            let state = carrier.state();
            let pending: Vec<Pending> = carrier
                .listeners()
                .iter()
                .rev()
                .map(|listener| Pending::Deliver {
                    target: *listener,
                    state: state.clone(),
                    depth: 1,
                })
                .collect();
            circuit.propagate(pending)
        })
    }

    /// Asks one component to re-emit its outputs.
    pub fn push(&mut self, id: ComponentId) -> Result<()> {
        self.transaction(|circuit| circuit.push_component(id))
    }

    /// Re-emits every component's outputs in registration order.
    pub fn push_all(&mut self) -> Result<()> {
        self.transaction(|circuit| {
            for index in 0..circuit.components.len() {
                circuit.push_component(ComponentId(index))?;
            }
            Ok(())
        })
    }

    /// Advances logical time by `ticks`, ticking every timed component
    /// (clocks) once per tick in registration order.
    pub fn step(&mut self, ticks: u64) -> Result<()> {
        self.transaction(|circuit| {
            for _ in 0..ticks {
                circuit.time += 1;
                for index in 0..circuit.components.len() {
                    if !circuit.components[index].is_timed() {
                        continue;
                    }
                    circuit.remember_component(index);
                    let mut out = Outputs::new();
                    circuit.components[index].tick(&mut out)?;
                    circuit.apply(ComponentId(index), out, 0)?;
                }
            }
            Ok(())
        })
    }

    /// Runs `f` against a component of concrete type `T` and propagates any
    /// outputs it collects, e.g. to start or stop a clock.
    pub fn control<T, R, F>(&mut self, id: ComponentId, f: F) -> Result<R>
    where
        T: Component + 'static,
        F: FnOnce(&mut T, &mut Outputs) -> Result<R>,
    {
        self.transaction(|circuit| {
            circuit.remember_component(id.0);
            let component = circuit
                .components
                .get_mut(id.0)
                .ok_or(SimError::UnknownComponent(id.0))?;
            let name = component.name().to_string();
            let typed = component
                .as_any_mut()
                .downcast_mut::<T>()
                .ok_or_else(|| {
                    SimError::Configuration(format!(
                        "component '{}' is not a {}",
                        name,
                        std::any::type_name::<T>()
                    ))
                })?;
            let mut out = Outputs::new();
            let result = f(typed, &mut out)?;
            circuit.apply(id, out, 0)?;
            Ok(result)
        })
    }

    // ---- propagation ----

    fn push_component(&mut self, id: ComponentId) -> Result<()> {
        self.remember_component(id.0);
        let component = self
            .components
            .get_mut(id.0)
            .ok_or(SimError::UnknownComponent(id.0))?;
        let mut out = Outputs::new();
        component.push(&mut out)?;
        self.apply(id, out, 0)
    }

    /// Propagates the outputs a component collected outside of a delivery.
    fn apply(&mut self, id: ComponentId, out: Outputs, depth: usize) -> Result<()> {
        let mut pending = Vec::new();
        self.schedule(id, out, depth, &mut pending);
        self.propagate(pending)
    }

    /// Runs a wave to completion. `pending` is a stack: the last entry is
    /// processed first, and every step pushes its follow-up work in reverse
    /// so the wave visits listeners depth-first in attachment order.
    fn propagate(&mut self, mut pending: Vec<Pending>) -> Result<()> {
        while let Some(work) = pending.pop() {
            match work {
                Pending::Write {
                    bus,
                    driver,
                    state,
                    depth,
                } => self.drive_bus(bus, driver, state, depth, &mut pending)?,
                Pending::Output { port, state, depth } => {
                    let (bus, unchanged) = self.store_output(port.component, port.port, &state)?;
                    let Some(bus) = bus else {
                        continue;
                    };
                    let driver = Driver::Port(port);
                    if unchanged && self.is_asserted(bus, driver, &state) {
                        continue;
                    }
                    self.drive_bus(bus, driver, state, depth, &mut pending)?;
                }
                Pending::Deliver {
                    target,
                    state,
                    depth,
                } => self.deliver(target, state, depth, &mut pending)?,
            }
        }
        Ok(())
    }

    /// Queues a component's drives and hands its persisted images to the
    /// journal.
    fn schedule(&mut self, id: ComponentId, out: Outputs, depth: usize, pending: &mut Vec<Pending>) {
        let (drives, stores) = out.into_parts();
        if let Some(journal) = self.journal.as_mut() {
            journal.stores.extend(stores);
        }
        for (port, state) in drives.into_iter().rev() {
            pending.push(Pending::Output {
                port: PortRef::new(id, port),
                state,
                depth,
            });
        }
    }

    fn drive_bus(
        &mut self,
        bus: BusId,
        driver: Driver,
        state: State,
        depth: usize,
        pending: &mut Vec<Pending>,
    ) -> Result<()> {
        self.remember_bus(bus.0);
        let carrier = self
            .buses
            .get_mut(bus.0)
            .ok_or(SimError::UnknownBus(bus.0))?;
        match carrier.write(driver, state)? {
            BusWrite::Ignored => return Ok(()),
            BusWrite::Contention => {
                warn!("bus '{}' is driven by more than one driver", carrier.name());
            }
            BusWrite::Driven => {
                trace!("bus '{}' <- {}", carrier.name(), carrier.state());
            }
        }
        let state = carrier.state();
        for listener in carrier.listeners().iter().rev() {
            pending.push(Pending::Deliver {
                target: *listener,
                state: state.clone(),
                depth: depth + 1,
            });
        }
        Ok(())
    }

    fn deliver(
        &mut self,
        target: PortRef,
        state: State,
        depth: usize,
        pending: &mut Vec<Pending>,
    ) -> Result<()> {
        let index = target.component.0;
        if depth > self.max_depth {
            let component = self
                .components
                .get(index)
                .map(|component| component.name().to_string())
                .unwrap_or_default();
            error!(
                "propagation depth {} exceeded at '{}', aborting",
                self.max_depth, component
            );
            return Err(SimError::CycleDetected { depth, component });
        }

        self.remember_component(index);
        let component = self
            .components
            .get_mut(index)
            .ok_or(SimError::UnknownComponent(index))?;
        let port_name = component.base().qualified_name(target.port);
        let port = component
            .base_mut()
            .get_port_mut(target.port)
            .ok_or_else(|| SimError::UnknownPort {
                component: port_name.clone(),
                port: format!("#{}", target.port.index()),
            })?;
        if port.is_output() {
            return Err(SimError::Configuration(format!(
                "{} is an output and cannot receive a state",
                port_name
            )));
        }
        check_widths(
            &Endpoint::new(&port_name, port.width()),
            &Endpoint::new("delivered state", state.width()),
        )?;
        trace!("{} <- {} (depth {})", port_name, state, depth);

        if !port.accept(state) {
            return Ok(());
        }
        let mut out = Outputs::new();
        let reaction = component.react(target.port, &mut out);
        if let Some(port) = component.base_mut().get_port_mut(target.port) {
            port.finish_firing();
        }
        reaction?;
        self.schedule(target.component, out, depth, pending);
        Ok(())
    }

    /// Whether `driver` already owns `bus` with exactly `state` on it.
    fn is_asserted(&self, bus: BusId, driver: Driver, state: &State) -> bool {
        self.buses
            .get(bus.0)
            .map(|carrier| carrier.driver() == Some(driver) && carrier.state() == state)
            .unwrap_or(false)
    }

    /// Stores a driven state on an output port, returning its bus and whether
    /// the port already held that state.
    fn store_output(
        &mut self,
        id: ComponentId,
        port_id: PortId,
        state: &State,
    ) -> Result<(Option<BusId>, bool)> {
        let component = self
            .components
            .get_mut(id.0)
            .ok_or(SimError::UnknownComponent(id.0))?;
        let port_name = component.base().qualified_name(port_id);
        let port = component
            .base_mut()
            .get_port_mut(port_id)
            .ok_or_else(|| SimError::UnknownPort {
                component: port_name.clone(),
                port: format!("#{}", port_id.index()),
            })?;
        if !port.is_output() {
            return Err(SimError::Configuration(format!(
                "{} is not an output and cannot be driven",
                port_name
            )));
        }
        check_widths(
            &Endpoint::new(&port_name, port.width()),
            &Endpoint::new("driven state", state.width()),
        )?;
        let unchanged = port.state() == state;
        port.store(state.clone());
        Ok((port.bus(), unchanged))
    }

    // ---- atomicity ----

    fn transaction<R>(&mut self, op: impl FnOnce(&mut Self) -> Result<R>) -> Result<R> {
        if self.journal.is_some() {
            return op(self);
        }
        self.journal = Some(Journal {
            time: self.time,
            components: HashMap::new(),
            buses: HashMap::new(),
            stores: Vec::new(),
        });
        let result = op(self);
        let Some(journal) = self.journal.take() else {
            return result;
        };
        let result = result.and_then(|value| {
            for store in &journal.stores {
                store.flush()?;
            }
            Ok(value)
        });
        if let Err(err) = &result {
            warn!("{}: rolling back after error: {}", self.name, err);
            self.rollback(journal);
        }
        result
    }

    fn rollback(&mut self, journal: Journal) {
        self.time = journal.time;
        for (index, component) in journal.components {
            self.components[index] = component;
        }
        for (index, bus) in journal.buses {
            self.buses[index] = bus;
        }
    }

    fn remember_component(&mut self, index: usize) {
        if let Some(journal) = self.journal.as_mut() {
            if !journal.components.contains_key(&index) {
                if let Some(component) = self.components.get(index) {
                    journal.components.insert(index, component.clone_box());
                }
            }
        }
    }

    fn remember_bus(&mut self, index: usize) {
        if let Some(journal) = self.journal.as_mut() {
            if !journal.buses.contains_key(&index) {
                if let Some(bus) = self.buses.get(index) {
                    journal.buses.insert(index, bus.clone());
                }
            }
        }
    }
}
