use super::{check_geometry, read_word, words_from_values};
use crate::component::{BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::{Result, SimError};
use crate::port::Edge;
use crate::signal::State;
use log::debug;
use std::fs;
use std::path::Path;

/// Read-only memory. Ports: `A` address, `OE` output enable, `O` data out.
/// While `OE` is High every address change drives the addressed word.
#[derive(Debug, Clone)]
pub struct Rom {
    base: BaseComponent,
    data_width: usize,
    words: Vec<State>,
    address: PortId,
    output_enable: PortId,
    output: PortId,
}

impl Rom {
    /// An all-Low ROM.
    pub fn new(name: impl Into<String>, addr_width: usize, data_width: usize) -> Result<Self> {
        Self::from_values(name, addr_width, data_width, &[])
    }

    /// Contents from integers, one per address from 0; the rest reads Low.
    pub fn from_values(
        name: impl Into<String>,
        addr_width: usize,
        data_width: usize,
        values: &[i64],
    ) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        let size = check_geometry(base.name(), addr_width, data_width)?;
        let words = words_from_values(base.name(), values, size, data_width)?;
        let address = base.add_input("A", addr_width);
        let output_enable = base.add_trigger("OE", Edge::High);
        let output = base.add_output("O", data_width);
        Ok(Rom {
            base,
            data_width,
            words,
            address,
            output_enable,
            output,
        })
    }

    /// Contents from a JSON array of integers.
    pub fn from_json_file(
        name: impl Into<String>,
        addr_width: usize,
        data_width: usize,
        path: impl AsRef<Path>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            SimError::Configuration(format!("failed to read ROM image '{}': {}", path.display(), e))
        })?;
        let values: Vec<i64> = serde_json::from_str(&content)?;
        debug!("loaded {} words from {}", values.len(), path.display());
        Self::from_values(name, addr_width, data_width, &values)
    }

    pub fn words(&self) -> &[State] {
        &self.words
    }
}

impl Component for Rom {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        if self.base.is_active(self.output_enable) {
            let word = read_word(&self.words, self.base.state(self.address), self.data_width);
            out.drive(self.output, word);
        }
        Ok(())
    }
}
