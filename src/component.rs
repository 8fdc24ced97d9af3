use crate::connection::PortId;
use crate::error::{Result, SimError};
use crate::persistence::RamStore;
use crate::port::{Edge, Port};
use crate::signal::{LogicValue, State};
use log::debug;
use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// States a component wants driven onto its output ports, in order, plus any
/// RAM images it wants persisted.
///
/// Reactions only compute; the circuit applies the collected drives after the
/// reaction returns, so no component is borrowed while its outputs propagate.
/// Persisted images are held back until the whole operation has succeeded.
#[derive(Debug, Default)]
pub struct Outputs {
    drives: Vec<(PortId, State)>,
    stores: Vec<PendingStore>,
}

impl Outputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drive(&mut self, port: PortId, state: State) {
        self.drives.push((port, state));
    }

    /// Requests that `data` be written to `store` under `key` once the
    /// current operation commits.
    pub fn persist(&mut self, store: Rc<dyn RamStore>, key: impl Into<String>, data: Vec<i64>) {
        self.stores.push(PendingStore {
            store,
            key: key.into(),
            data,
        });
    }

    pub(crate) fn into_parts(self) -> (Vec<(PortId, State)>, Vec<PendingStore>) {
        (self.drives, self.stores)
    }
}

/// A RAM image waiting for its operation to commit.
#[derive(Debug)]
pub(crate) struct PendingStore {
    store: Rc<dyn RamStore>,
    key: String,
    data: Vec<i64>,
}

impl PendingStore {
    pub(crate) fn flush(&self) -> Result<()> {
        debug!("persisting {} words under '{}'", self.data.len(), self.key);
        self.store.store(&self.key, &self.data)
    }
}

/// Object-safe plumbing every component gets for free: snapshots for
/// rollback and downcasting for typed access.
pub trait DynComponent {
    fn clone_box(&self) -> Box<dyn Component>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component + Clone + 'static> DynComponent for T {
    fn clone_box(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// Component trait
pub trait Component: DynComponent + fmt::Debug {
    fn base(&self) -> &BaseComponent;
    fn base_mut(&mut self) -> &mut BaseComponent;

    /// Recomputes the component after `port` received a new state.
    fn react(&mut self, port: PortId, out: &mut Outputs) -> Result<()>;

    /// Re-emits the component's outputs without any input having changed.
    fn push(&mut self, _out: &mut Outputs) -> Result<()> {
        Ok(())
    }

    /// Advances one unit of logical time. Only called when [`is_timed`]
    /// returns true.
    ///
    /// [`is_timed`]: Component::is_timed
    fn tick(&mut self, _out: &mut Outputs) -> Result<()> {
        Ok(())
    }

    fn is_timed(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        self.base().name()
    }
}

impl Clone for Box<dyn Component> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Name and port table shared by every component.
#[derive(Debug, Clone)]
pub struct BaseComponent {
    name: String,
    ports: Vec<Port>,
}

impl BaseComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ports: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_port(&mut self, port: Port) -> PortId {
        self.ports.push(port);
        PortId(self.ports.len() - 1)
    }

    pub fn add_input(&mut self, name: impl Into<String>, width: usize) -> PortId {
        self.add_port(Port::input(name, width))
    }

    pub fn add_output(&mut self, name: impl Into<String>, width: usize) -> PortId {
        self.add_port(Port::output(name, width))
    }

    pub fn add_trigger(&mut self, name: impl Into<String>, edge: Edge) -> PortId {
        self.add_port(Port::trigger(name, edge))
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn get_port(&self, id: PortId) -> Option<&Port> {
        self.ports.get(id.0)
    }

    pub(crate) fn get_port_mut(&mut self, id: PortId) -> Option<&mut Port> {
        self.ports.get_mut(id.0)
    }

    pub fn find_port(&self, name: &str) -> Result<PortId> {
        self.ports
            .iter()
            .position(|port| port.name() == name)
            .map(PortId)
            .ok_or_else(|| SimError::UnknownPort {
                component: self.name.clone(),
                port: name.to_string(),
            })
    }

    /// Port ids handed out at construction always index the table.
    pub fn port(&self, id: PortId) -> &Port {
        &self.ports[id.0]
    }

    pub fn state(&self, id: PortId) -> &State {
        self.port(id).state()
    }

    pub fn value(&self, id: PortId) -> LogicValue {
        self.state(id).lsb()
    }

    pub fn is_high(&self, id: PortId) -> bool {
        self.value(id) == LogicValue::High
    }

    pub fn is_active(&self, id: PortId) -> bool {
        self.port(id).is_active()
    }

    pub fn qualified_name(&self, id: PortId) -> String {
        match self.get_port(id) {
            Some(port) => format!("{}.{}", self.name, port.name()),
            None => format!("{}.#{}", self.name, id.0),
        }
    }
}

/// Rejects zero-width elements at construction.
pub fn require_width(element: &str, width: usize) -> Result<usize> {
    if width == 0 {
        return Err(SimError::Configuration(format!(
            "{} must be at least one bit wide",
            element
        )));
    }
    Ok(width)
}
