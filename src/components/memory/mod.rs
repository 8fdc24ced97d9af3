//! Addressed word storage.

pub mod ram;
pub mod rom;

pub use ram::Ram;
pub use rom::Rom;

use crate::error::{Result, SimError};
use crate::signal::{LogicValue, State, MAX_INT_WIDTH};

/// Widest address a memory may declare; `2^20` words per instance.
pub const MAX_ADDR_WIDTH: usize = 20;

fn check_geometry(name: &str, addr_width: usize, data_width: usize) -> Result<usize> {
    if addr_width == 0 || addr_width > MAX_ADDR_WIDTH {
        return Err(SimError::Configuration(format!(
            "memory '{}' needs an address width between 1 and {}, got {}",
            name, MAX_ADDR_WIDTH, addr_width
        )));
    }
    if data_width == 0 || data_width > MAX_INT_WIDTH {
        return Err(SimError::Configuration(format!(
            "memory '{}' needs a data width between 1 and {}, got {}",
            name, MAX_INT_WIDTH, data_width
        )));
    }
    Ok(1 << addr_width)
}

/// Word for a preloaded integer. Negative values are two's complement;
/// non-negative values may use the full unsigned range of the width.
fn word_from_i64(value: i64, width: usize) -> Result<State> {
    if value < 0 {
        State::from_int(value, width)
    } else {
        State::from_unsigned(value as u64, width)
    }
}

/// Builds `size` words from preloaded contents, padding with Low.
fn words_from_values(name: &str, values: &[i64], size: usize, width: usize) -> Result<Vec<State>> {
    if values.len() > size {
        return Err(SimError::Configuration(format!(
            "memory '{}' holds {} words but {} were supplied",
            name,
            size,
            values.len()
        )));
    }
    let mut words = values
        .iter()
        .map(|value| word_from_i64(*value, width))
        .collect::<Result<Vec<_>>>()?;
    words.resize(size, State::low(width));
    Ok(words)
}

/// Word at the address on `address`, or an all-Floating / all-Error word
/// when the address itself is indeterminate.
fn read_word(words: &[State], address: &State, width: usize) -> State {
    if address.has_floating() {
        return State::new(width);
    }
    match address.to_unsigned() {
        Ok(index) => words
            .get(index as usize)
            .cloned()
            .unwrap_or_else(|| State::filled(width, LogicValue::Error)),
        Err(_) => State::error(width),
    }
}
