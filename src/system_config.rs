//! # JSON Configuration System
//!
//! This module builds circuits from JSON descriptions.
//!
//! ## Key Features
//!
//! - **JSON Circuit Definition**: buses, components and connections in one file
//! - **Component Factory**: a registry of component-type constructors
//! - **Ordered Wiring**: connections are attached in file order, which is the
//!   listener notification order
//! - **Extensible Design**: callers can register their own component types
//!
//! ## Usage
//!
//! ```no_run
//! use rusty_logic::system_config::CircuitFactory;
//!
//! let factory = CircuitFactory::new();
//! let mut system = factory.create_from_json("configs/datapath.json").expect("Could not create circuit!");
//! system.run(16).expect("Simulation failed!");
//!
//! let info = system.info();
//! println!("Created circuit: {} with {} components", info.name, info.component_count);
//! ```
//!
//! ## Configuration File Format
//!
//! ```json
//! {
//!   "name": "Accumulator",
//!   "description": "Register feeding an adder",
//!   "buses": [{"name": "sum", "width": 8}],
//!   "components": [
//!     {"name": "acc", "component_type": "register", "properties": {"width": 8, "edge": "falling"}}
//!   ],
//!   "connections": [
//!     {"bus": "sum", "ports": [{"component": "acc", "port": "D"}]}
//!   ]
//! }
//! ```

use crate::circuit::{Circuit, DEFAULT_MAX_DEPTH};
use crate::component::Component;
use crate::components::{
    Alu, BitSelector, Buffer, BufferSetting, Clock, Constant, ControlledBuffer, Counter,
    Demultiplexer, FlipFlop, FlipFlopKind, Gate, GateKind, Multiplexer, NotGate, OverflowPolicy,
    PullResistor, Ram, Readout, Register, Rom, ShiftRegister, Splitter,
};
use crate::connection::ComponentId;
use crate::error::{Result, SimError};
use crate::persistence::{JsonRamDump, RamStore};
use crate::port::Edge;
use crate::signal::{LogicValue, State};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// JSON-based circuit configuration structures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub buses: Vec<BusConfig>,
    #[serde(default)]
    pub components: Vec<ComponentConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    pub name: String,
    pub width: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentConfig {
    pub name: String,
    pub component_type: String,
    #[serde(default)]
    pub properties: HashMap<String, serde_json::Value>,
}

/// Every listed port is attached to `bus`, in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub bus: String,
    pub ports: Vec<PortReference>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortReference {
    pub component: String,
    pub port: String,
}

/// What a constructor may need besides its own properties.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub ram_store: Rc<dyn RamStore>,
    /// Directory relative file properties are resolved against.
    pub base_dir: PathBuf,
}

impl BuildContext {
    pub fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}

pub type ComponentConstructor = fn(&ComponentConfig, &BuildContext) -> Result<Box<dyn Component>>;

/// Typed, error-reporting access to one component's properties.
pub struct Properties<'a> {
    config: &'a ComponentConfig,
}

impl<'a> Properties<'a> {
    pub fn new(config: &'a ComponentConfig) -> Self {
        Properties { config }
    }

    fn invalid(&self, key: &str, expected: &str) -> SimError {
        SimError::Configuration(format!(
            "property '{}' of component '{}' must be {}",
            key, self.config.name, expected
        ))
    }

    fn get(&self, key: &str) -> Option<&'a serde_json::Value> {
        self.config.properties.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn usize(&self, key: &str) -> Result<usize> {
        self.get(key)
            .ok_or_else(|| self.invalid(key, "present"))?
            .as_u64()
            .map(|value| value as usize)
            .ok_or_else(|| self.invalid(key, "a non-negative integer"))
    }

    pub fn usize_or(&self, key: &str, default: usize) -> Result<usize> {
        match self.get(key) {
            Some(_) => self.usize(key),
            None => Ok(default),
        }
    }

    pub fn u64_opt(&self, key: &str) -> Result<Option<u64>> {
        match self.get(key) {
            Some(value) => value
                .as_u64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a non-negative integer")),
            None => Ok(None),
        }
    }

    pub fn i64_opt(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            Some(value) => value
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "an integer")),
            None => Ok(None),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            Some(value) => value.as_bool().ok_or_else(|| self.invalid(key, "a boolean")),
            None => Ok(default),
        }
    }

    pub fn str_opt(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| self.invalid(key, "a string")),
            None => Ok(None),
        }
    }

    /// Any serde-deserializable value, e.g. an enumerated setting given as a
    /// lowercase string.
    pub fn parse_or<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                SimError::Configuration(format!(
                    "property '{}' of component '{}' is invalid: {}",
                    key, self.config.name, e
                ))
            }),
            None => Ok(default),
        }
    }

    pub fn parse<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self.get(key).ok_or_else(|| self.invalid(key, "present"))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            SimError::Configuration(format!(
                "property '{}' of component '{}' is invalid: {}",
                key, self.config.name, e
            ))
        })
    }
}

/// Circuit factory for creating circuits from JSON configuration
#[derive(Debug)]
pub struct CircuitFactory {
    component_registry: HashMap<String, ComponentConstructor>,
    ram_store: Rc<dyn RamStore>,
}

impl Default for CircuitFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitFactory {
    /// A factory whose non-volatile RAMs persist to the default dump file.
    pub fn new() -> Self {
        Self::with_ram_store(Rc::new(JsonRamDump::default()))
    }

    pub fn with_ram_store(ram_store: Rc<dyn RamStore>) -> Self {
        let mut factory = CircuitFactory {
            component_registry: HashMap::new(),
            ram_store,
        };
        factory.register_default_components();
        factory
    }

    /// Adds or replaces a component type.
    pub fn register(&mut self, component_type: impl Into<String>, constructor: ComponentConstructor) {
        self.component_registry
            .insert(component_type.into(), constructor);
    }

    pub fn component_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.component_registry.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    fn register_default_components(&mut self) {
        self.register("not", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(NotGate::new(&config.name, props.usize_or("width", 1)?)?))
        });
        self.register("buffer", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(Buffer::new(
                &config.name,
                props.usize_or("width", 1)?,
                props.parse_or("setting", BufferSetting::LowHigh)?,
            )?))
        });
        self.register("controlled_buffer", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(ControlledBuffer::new(&config.name, props.usize_or("width", 1)?)?))
        });
        self.register("gate", |config, _| {
            let props = Properties::new(config);
            gate(config, props.parse("kind")?)
        });
        self.register("and", |config, _| gate(config, GateKind::And));
        self.register("or", |config, _| gate(config, GateKind::Or));
        self.register("nand", |config, _| gate(config, GateKind::Nand));
        self.register("nor", |config, _| gate(config, GateKind::Nor));
        self.register("xor", |config, _| gate(config, GateKind::Xor));
        self.register("xnor", |config, _| gate(config, GateKind::Xnor));

        self.register("flip_flop", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(FlipFlop::new(
                &config.name,
                props.parse_or("kind", FlipFlopKind::D)?,
                props.parse_or("edge", Edge::Rising)?,
            )?))
        });
        self.register("register", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(Register::new(
                &config.name,
                props.usize("width")?,
                props.parse_or("edge", Edge::Rising)?,
            )?))
        });
        self.register("counter", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(Counter::new(
                &config.name,
                props.usize("width")?,
                props.u64_opt("max")?,
                props.parse_or("overflow", OverflowPolicy::Wrap)?,
                props.parse_or("edge", Edge::Rising)?,
            )?))
        });
        self.register("shift_register", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(ShiftRegister::new(
                &config.name,
                props.usize_or("width", 1)?,
                props.usize("stages")?,
                props.parse_or("edge", Edge::Rising)?,
            )?))
        });

        self.register("ram", |config, context| {
            let props = Properties::new(config);
            let addr_width = props.usize("addr_width")?;
            let data_width = props.usize("data_width")?;
            let edge = props.parse_or("edge", Edge::Rising)?;
            let async_read = props.bool_or("async_read", false)?;
            let ram = match props.str_opt("persist_key")? {
                Some(key) => Ram::non_volatile(
                    &config.name,
                    addr_width,
                    data_width,
                    edge,
                    async_read,
                    key,
                    context.ram_store.clone(),
                )?,
                None => Ram::new(&config.name, addr_width, data_width, edge, async_read)?,
            };
            Ok(Box::new(ram))
        });
        self.register("rom", |config, context| {
            let props = Properties::new(config);
            let addr_width = props.usize("addr_width")?;
            let data_width = props.usize("data_width")?;
            let rom = if let Some(path) = props.str_opt("data_path")? {
                Rom::from_json_file(&config.name, addr_width, data_width, context.resolve(path))?
            } else {
                let values: Vec<i64> = props.parse_or("data", Vec::new())?;
                Rom::from_values(&config.name, addr_width, data_width, &values)?
            };
            Ok(Box::new(rom))
        });

        self.register("alu", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(Alu::new(&config.name, props.usize("width")?)?))
        });

        self.register("multiplexer", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(Multiplexer::new(
                &config.name,
                props.usize_or("selector_width", 1)?,
                props.usize_or("width", 1)?,
            )?))
        });
        self.register("demultiplexer", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(Demultiplexer::new(
                &config.name,
                props.usize_or("selector_width", 1)?,
                props.usize_or("width", 1)?,
                props.bool_or("tristate", false)?,
            )?))
        });
        self.register("bit_selector", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(BitSelector::new(
                &config.name,
                props.usize("input_width")?,
                props.usize("output_width")?,
            )?))
        });

        self.register("splitter", |config, _| {
            let props = Properties::new(config);
            let mut splitter = Splitter::new(&config.name, props.usize("width")?)?;
            let inputs: Vec<Vec<usize>> = props.parse_or("inputs", Vec::new())?;
            let outputs: Vec<Vec<usize>> = props.parse_or("outputs", Vec::new())?;
            for indices in inputs {
                splitter.add_input(indices)?;
            }
            for indices in outputs {
                splitter.add_output(indices)?;
            }
            Ok(Box::new(splitter))
        });
        self.register("pull_resistor", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(PullResistor::new(
                &config.name,
                props.usize_or("width", 1)?,
                props.parse_or("level", LogicValue::Low)?,
            )?))
        });
        self.register("constant", |config, _| {
            let props = Properties::new(config);
            let width = props.usize_or("width", 1)?;
            let constant = match props.i64_opt("value")? {
                Some(value) if value < 0 => Constant::from_int(&config.name, value, width)?,
                Some(value) => Constant::new(&config.name, State::from_unsigned(value as u64, width)?)?,
                None => Constant::filled(&config.name, width, props.parse_or("level", LogicValue::Low)?)?,
            };
            Ok(Box::new(constant))
        });
        self.register("readout", |config, _| {
            let props = Properties::new(config);
            Ok(Box::new(Readout::new(&config.name, props.usize_or("width", 1)?)?))
        });
        self.register("clock", |config, _| {
            let props = Properties::new(config);
            let mut clock = Clock::new(&config.name, props.u64_opt("half_period")?.unwrap_or(1))?;
            if props.contains("high_ticks") || props.contains("low_ticks") {
                let high = props.u64_opt("high_ticks")?.unwrap_or(1);
                let low = props.u64_opt("low_ticks")?.unwrap_or(1);
                clock.set_duty(high, low)?;
            }
            Ok(Box::new(clock))
        });
    }

    pub fn create_from_json(&self, json_path: impl AsRef<Path>) -> Result<ConfiguredCircuit> {
        let json_path = json_path.as_ref();
        let config = self.load_json_config(json_path)?;
        let base_dir = json_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        self.create(config, base_dir)
    }

    /// Builds from JSON text; relative file properties resolve against `base_dir`.
    pub fn create_from_str(&self, json: &str, base_dir: impl Into<PathBuf>) -> Result<ConfiguredCircuit> {
        let config: CircuitConfig = serde_json::from_str(json)?;
        self.create(config, base_dir.into())
    }

    pub fn create(&self, config: CircuitConfig, base_dir: PathBuf) -> Result<ConfiguredCircuit> {
        let context = BuildContext {
            ram_store: self.ram_store.clone(),
            base_dir,
        };
        let mut circuit =
            Circuit::with_max_depth(&config.name, config.max_depth.unwrap_or(DEFAULT_MAX_DEPTH));
        self.create_components(&config, &context, &mut circuit)?;
        self.create_buses(&config, &mut circuit)?;
        self.connect_components(&config, &mut circuit)?;
        info!(
            "built circuit '{}': {} components, {} buses",
            config.name,
            circuit.component_count(),
            circuit.bus_count()
        );
        Ok(ConfiguredCircuit::new(config, circuit))
    }

    fn load_json_config(&self, path: &Path) -> Result<CircuitConfig> {
        let content = fs::read_to_string(path).map_err(|e| {
            SimError::Configuration(format!("failed to read config file '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            SimError::Configuration(format!("failed to parse JSON config '{}': {}", path.display(), e))
        })
    }

    fn create_components(&self, config: &CircuitConfig, context: &BuildContext, circuit: &mut Circuit) -> Result<()> {
        let mut names = HashSet::new();
        for component_config in &config.components {
            if !names.insert(component_config.name.as_str()) {
                return Err(SimError::Configuration(format!(
                    "duplicate component name '{}'",
                    component_config.name
                )));
            }
            let constructor = self
                .component_registry
                .get(&component_config.component_type)
                .ok_or_else(|| {
                    SimError::Configuration(format!(
                        "unknown component type '{}' for '{}'",
                        component_config.component_type, component_config.name
                    ))
                })?;
            circuit.add_boxed(constructor(component_config, context)?);
        }
        Ok(())
    }

    fn create_buses(&self, config: &CircuitConfig, circuit: &mut Circuit) -> Result<()> {
        for bus in &config.buses {
            if circuit.find_bus(&bus.name).is_some() {
                return Err(SimError::Configuration(format!(
                    "duplicate bus name '{}'",
                    bus.name
                )));
            }
            circuit.add_bus(&bus.name, bus.width)?;
        }
        Ok(())
    }

    fn connect_components(&self, config: &CircuitConfig, circuit: &mut Circuit) -> Result<()> {
        for connection in &config.connections {
            let bus = circuit.find_bus(&connection.bus).ok_or_else(|| {
                SimError::Configuration(format!("connection to unknown bus '{}'", connection.bus))
            })?;
            for reference in &connection.ports {
                let component = circuit.find_component(&reference.component).ok_or_else(|| {
                    SimError::Configuration(format!(
                        "connection to unknown component '{}'",
                        reference.component
                    ))
                })?;
                let port = circuit.port(component, &reference.port)?;
                debug!("connecting {}.{} to '{}'", reference.component, reference.port, connection.bus);
                circuit.attach(port, bus)?;
            }
        }
        Ok(())
    }
}

fn gate(config: &ComponentConfig, kind: GateKind) -> Result<Box<dyn Component>> {
    let props = Properties::new(config);
    Ok(Box::new(Gate::new(
        &config.name,
        kind,
        props.usize_or("width", 1)?,
        props.usize_or("inputs", 2)?,
    )?))
}

/// A circuit built from JSON configuration
pub struct ConfiguredCircuit {
    config: CircuitConfig,
    circuit: Circuit,
}

impl ConfiguredCircuit {
    pub fn new(config: CircuitConfig, circuit: Circuit) -> Self {
        ConfiguredCircuit { config, circuit }
    }

    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn circuit_mut(&mut self) -> &mut Circuit {
        &mut self.circuit
    }

    pub fn into_circuit(self) -> Circuit {
        self.circuit
    }

    /// Clock components, in declaration order.
    pub fn clocks(&self) -> Vec<ComponentId> {
        self.config
            .components
            .iter()
            .filter(|component| component.component_type == "clock")
            .filter_map(|component| self.circuit.find_component(&component.name))
            .collect()
    }

    /// Settles initial outputs, starts every clock and advances `steps` ticks.
    pub fn run(&mut self, steps: u64) -> Result<()> {
        info!("running '{}' for {} ticks", self.config.name, steps);
        self.circuit.push_all()?;
        for clock in self.clocks() {
            self.circuit.control::<Clock, _, _>(clock, |clock, out| {
                clock.start(out);
                Ok(())
            })?;
        }
        self.circuit.step(steps)
    }

    pub fn info(&self) -> SystemInfo {
        SystemInfo {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            component_count: self.circuit.component_count(),
            bus_count: self.circuit.bus_count(),
            time: self.circuit.time(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub name: String,
    pub description: String,
    pub component_count: usize,
    pub bus_count: usize,
    pub time: u64,
}
