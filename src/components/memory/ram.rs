use super::{check_geometry, read_word, words_from_values};
use crate::component::{BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::{Result, SimError};
use crate::persistence::RamStore;
use crate::port::Edge;
use crate::signal::State;
use log::debug;
use std::rc::Rc;

/// A non-volatile RAM's link to its store.
#[derive(Debug, Clone)]
struct Persistence {
    key: String,
    store: Rc<dyn RamStore>,
}

/// Random access memory of `2^addr_width` words.
///
/// Ports: `R` reset, `A` address, `WE` write enable, `OE` output enable, `C`
/// clock, `IN` data in, `OUT` data out. While the clock is active (or at any
/// time with asynchronous reads) `OE` High drives the addressed word; with
/// `WE` also High the clock stores `IN` at the address.
#[derive(Debug, Clone)]
pub struct Ram {
    base: BaseComponent,
    addr_width: usize,
    data_width: usize,
    async_read: bool,
    words: Vec<State>,
    persistence: Option<Persistence>,
    reset: PortId,
    address: PortId,
    write_enable: PortId,
    output_enable: PortId,
    clock: PortId,
    input: PortId,
    output: PortId,
}

impl Ram {
    pub fn new(
        name: impl Into<String>,
        addr_width: usize,
        data_width: usize,
        clock_edge: Edge,
        async_read: bool,
    ) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        let size = check_geometry(base.name(), addr_width, data_width)?;
        let reset = base.add_trigger("R", Edge::High);
        let address = base.add_input("A", addr_width);
        let write_enable = base.add_trigger("WE", Edge::High);
        let output_enable = base.add_trigger("OE", Edge::High);
        let clock = base.add_trigger("C", clock_edge);
        let input = base.add_input("IN", data_width);
        let output = base.add_output("OUT", data_width);
        Ok(Ram {
            base,
            addr_width,
            data_width,
            async_read,
            words: vec![State::low(data_width); size],
            persistence: None,
            reset,
            address,
            write_enable,
            output_enable,
            clock,
            input,
            output,
        })
    }

    /// Non-volatile RAM: contents are loaded from `store` under `key` (all-Low
    /// if the key is unknown) and the whole array is written back after every
    /// write or reset.
    pub fn non_volatile(
        name: impl Into<String>,
        addr_width: usize,
        data_width: usize,
        clock_edge: Edge,
        async_read: bool,
        key: impl Into<String>,
        store: Rc<dyn RamStore>,
    ) -> Result<Self> {
        let mut ram = Self::new(name, addr_width, data_width, clock_edge, async_read)?;
        let key = key.into();
        if key.is_empty() {
            return Err(SimError::Configuration(format!(
                "non-volatile RAM '{}' needs a persistence key",
                ram.base.name()
            )));
        }
        if let Some(values) = store.fetch(&key)? {
            debug!("{}: restoring {} words from '{}'", ram.base.name(), values.len(), key);
            ram.words = words_from_values(ram.base.name(), &values, ram.words.len(), data_width)?;
        }
        ram.persistence = Some(Persistence { key, store });
        Ok(ram)
    }

    pub fn addr_width(&self) -> usize {
        self.addr_width
    }

    pub fn data_width(&self) -> usize {
        self.data_width
    }

    pub fn is_volatile(&self) -> bool {
        self.persistence.is_none()
    }

    pub fn persist_key(&self) -> Option<&str> {
        self.persistence.as_ref().map(|p| p.key.as_str())
    }

    pub fn words(&self) -> &[State] {
        &self.words
    }

    pub fn word(&self, address: usize) -> Option<&State> {
        self.words.get(address)
    }

    /// Queues the whole array for the store; it is written when the
    /// operation commits.
    fn persist(&self, out: &mut Outputs) -> Result<()> {
        let Some(persistence) = &self.persistence else {
            return Ok(());
        };
        let data = self
            .words
            .iter()
            .map(State::to_int)
            .collect::<Result<Vec<_>>>()?;
        out.persist(persistence.store.clone(), persistence.key.as_str(), data);
        Ok(())
    }

    fn write(&mut self, out: &mut Outputs) -> Result<()> {
        let address = self.base.state(self.address).to_unsigned()? as usize;
        let value = self.base.state(self.input).clone();
        if let Some(word) = self.words.get_mut(address) {
            *word = value;
        }
        self.persist(out)
    }
}

impl Component for Ram {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        if self.base.is_active(self.reset) {
            self.words = vec![State::low(self.data_width); self.words.len()];
            return self.persist(out);
        }

        let clocked = self.base.is_active(self.clock);
        if (self.async_read || clocked) && self.base.is_active(self.output_enable) {
            let word = read_word(&self.words, self.base.state(self.address), self.data_width);
            out.drive(self.output, word);
        }
        if clocked && self.base.is_active(self.write_enable) {
            self.write(out)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;
    use crate::components::routing::BitSelector;
    use crate::persistence::MemoryRamStore;
    use crate::signal::LogicValue::*;

    fn clock(circuit: &mut Circuit, ram: crate::connection::ComponentId) {
        let c = circuit.port(ram, "C").unwrap();
        circuit.set_input(c, State::bit(Low)).unwrap();
        circuit.set_input(c, State::bit(High)).unwrap();
    }

    #[test]
    fn test_write_then_read() {
        let mut circuit = Circuit::new("ram");
        let ram = circuit.add(Ram::new("ram", 4, 8, Edge::Rising, false).unwrap());
        let a = circuit.port(ram, "A").unwrap();
        let input = circuit.port(ram, "IN").unwrap();
        let we = circuit.port(ram, "WE").unwrap();
        let oe = circuit.port(ram, "OE").unwrap();
        let output = circuit.port(ram, "OUT").unwrap();

        circuit.set_input(a, State::from_unsigned(3, 4).unwrap()).unwrap();
        circuit.set_input(input, State::from_unsigned(0x42, 8).unwrap()).unwrap();
        circuit.set_input(we, State::bit(High)).unwrap();
        clock(&mut circuit, ram);
        assert_eq!(
            circuit.component::<Ram>(ram).unwrap().word(3).unwrap().to_unsigned().unwrap(),
            0x42
        );

        circuit.set_input(we, State::bit(Low)).unwrap();
        circuit.set_input(oe, State::bit(High)).unwrap();
        // Synchronous read: nothing until the clock.
        assert!(circuit.port_state(output).unwrap().is_all_floating());
        clock(&mut circuit, ram);
        assert_eq!(circuit.port_state(output).unwrap().to_unsigned().unwrap(), 0x42);
    }

    #[test]
    fn test_async_read_follows_address() {
        let mut circuit = Circuit::new("ram");
        let ram = circuit.add(Ram::new("ram", 2, 4, Edge::Rising, true).unwrap());
        let a = circuit.port(ram, "A").unwrap();
        let output = circuit.port(ram, "OUT").unwrap();
        circuit.set_input(circuit.port(ram, "OE").unwrap(), State::bit(High)).unwrap();
        assert!(circuit.port_state(output).unwrap().is_all_floating());
        circuit.set_input(a, State::from_unsigned(1, 2).unwrap()).unwrap();
        assert_eq!(circuit.port_state(output).unwrap(), &State::low(4));
    }

    #[test]
    fn test_write_to_indeterminate_address_fails() {
        let mut circuit = Circuit::new("ram");
        let ram = circuit.add(Ram::new("ram", 2, 4, Edge::Rising, false).unwrap());
        circuit.set_input(circuit.port(ram, "WE").unwrap(), State::bit(High)).unwrap();
        let c = circuit.port(ram, "C").unwrap();
        circuit.set_input(c, State::bit(Low)).unwrap();
        assert!(matches!(
            circuit.set_input(c, State::bit(High)),
            Err(SimError::IndeterminateState)
        ));
    }

    #[test]
    fn test_non_volatile_round_trip() {
        let store: Rc<dyn RamStore> = Rc::new(MemoryRamStore::new());
        let mut circuit = Circuit::new("ram");
        let ram = circuit.add(
            Ram::non_volatile("ram", 3, 16, Edge::Rising, false, "main", store.clone()).unwrap(),
        );
        circuit.set_input(circuit.port(ram, "A").unwrap(), State::from_unsigned(3, 3).unwrap()).unwrap();
        circuit.set_input(circuit.port(ram, "IN").unwrap(), State::from_unsigned(1234, 16).unwrap()).unwrap();
        circuit.set_input(circuit.port(ram, "WE").unwrap(), State::bit(High)).unwrap();
        clock(&mut circuit, ram);

        let again = Ram::non_volatile("copy", 3, 16, Edge::Rising, false, "main", store).unwrap();
        assert_eq!(again.word(3).unwrap().to_unsigned().unwrap(), 1234);
        assert_eq!(again.persist_key(), Some("main"));
    }

    #[test]
    fn test_store_waits_for_the_whole_operation() {
        let store: Rc<dyn RamStore> = Rc::new(MemoryRamStore::new());
        let mut circuit = Circuit::new("ram");
        let ram = circuit.add(
            Ram::non_volatile("ram", 2, 4, Edge::Rising, false, "main", store.clone()).unwrap(),
        );
        // Slice 1 of a 3-bit input overruns, so a High clock fails after the write.
        let selector = circuit.add(BitSelector::new("sel", 3, 2).unwrap());
        let clk = circuit.add_bus("clk", 1).unwrap();
        circuit.attach(circuit.port(ram, "C").unwrap(), clk).unwrap();
        circuit.attach(circuit.port(selector, "S").unwrap(), clk).unwrap();

        circuit.set_input(circuit.port(ram, "A").unwrap(), State::from_unsigned(3, 2).unwrap()).unwrap();
        circuit.set_input(circuit.port(ram, "IN").unwrap(), State::from_unsigned(9, 4).unwrap()).unwrap();
        circuit.set_input(circuit.port(ram, "WE").unwrap(), State::bit(High)).unwrap();
        circuit.drive_bit(clk, Low).unwrap();
        assert!(matches!(
            circuit.drive_bit(clk, High),
            Err(SimError::Range { value: 1, width: 3 })
        ));

        assert_eq!(circuit.component::<Ram>(ram).unwrap().word(3), Some(&State::low(4)));
        assert!(store.fetch("main").unwrap().is_none());
        let again = Ram::non_volatile("copy", 2, 4, Edge::Rising, false, "main", store).unwrap();
        assert_eq!(again.word(3), Some(&State::low(4)));
    }

    #[test]
    fn test_empty_key_rejected() {
        let store: Rc<dyn RamStore> = Rc::new(MemoryRamStore::new());
        assert!(Ram::non_volatile("ram", 2, 4, Edge::Rising, false, "", store).is_err());
    }
}
