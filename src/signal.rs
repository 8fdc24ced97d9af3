//! # Four-valued signal state
//!
//! A [`State`] is a fixed-width vector of [`LogicValue`]s, bit 0 being the
//! least significant. Integer conversions are only defined for definite
//! states (every bit Low or High).

use crate::error::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// Widest state that converts to and from a machine integer.
pub const MAX_INT_WIDTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicValue {
    #[default]
    Floating,
    Low,
    High,
    Error,
}

impl LogicValue {
    pub fn to_str(&self) -> &'static str {
        match self {
            LogicValue::Floating => "Floating",
            LogicValue::Low => "Low",
            LogicValue::High => "High",
            LogicValue::Error => "Error",
        }
    }

    pub fn to_char(&self) -> char {
        match self {
            LogicValue::Floating => 'Z',
            LogicValue::Low => '0',
            LogicValue::High => '1',
            LogicValue::Error => 'X',
        }
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            LogicValue::High
        } else {
            LogicValue::Low
        }
    }

    /// Total coercion to `bool`: only Low and High have a truth value.
    pub fn to_bool(&self) -> Result<bool> {
        match self {
            LogicValue::Low => Ok(false),
            LogicValue::High => Ok(true),
            LogicValue::Floating | LogicValue::Error => Err(SimError::IndeterminateState),
        }
    }

    pub fn is_definite(&self) -> bool {
        matches!(self, LogicValue::Low | LogicValue::High)
    }
}

impl Not for LogicValue {
    type Output = LogicValue;

    fn not(self) -> LogicValue {
        match self {
            LogicValue::Low => LogicValue::High,
            LogicValue::High => LogicValue::Low,
            LogicValue::Floating | LogicValue::Error => LogicValue::Error,
        }
    }
}

impl fmt::Display for LogicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    bits: Vec<LogicValue>,
}

impl State {
    /// An undriven state: every bit Floating.
    pub fn new(width: usize) -> Self {
        Self::filled(width, LogicValue::Floating)
    }

    pub fn filled(width: usize, value: LogicValue) -> Self {
        State {
            bits: vec![value; width],
        }
    }

    pub fn low(width: usize) -> Self {
        Self::filled(width, LogicValue::Low)
    }

    pub fn error(width: usize) -> Self {
        Self::filled(width, LogicValue::Error)
    }

    pub fn from_bits(bits: Vec<LogicValue>) -> Self {
        State { bits }
    }

    pub fn bit(value: LogicValue) -> Self {
        State { bits: vec![value] }
    }

    pub fn width(&self) -> usize {
        self.bits.len()
    }

    pub fn bits(&self) -> &[LogicValue] {
        &self.bits
    }

    pub fn get(&self, index: usize) -> Result<LogicValue> {
        self.bits
            .get(index)
            .copied()
            .ok_or(SimError::IndexOutOfRange {
                index,
                width: self.width(),
            })
    }

    pub fn set(&mut self, index: usize, value: LogicValue) -> Result<()> {
        let width = self.width();
        let bit = self
            .bits
            .get_mut(index)
            .ok_or(SimError::IndexOutOfRange { index, width })?;
        *bit = value;
        Ok(())
    }

    /// Bit 0, or Floating for a zero-width state.
    pub fn lsb(&self) -> LogicValue {
        self.bits.first().copied().unwrap_or_default()
    }

    pub fn set_all(&mut self, value: LogicValue) {
        self.bits.iter_mut().for_each(|bit| *bit = value);
    }

    pub fn is_definite(&self) -> bool {
        self.bits.iter().all(LogicValue::is_definite)
    }

    pub fn is_all_floating(&self) -> bool {
        self.bits.iter().all(|bit| *bit == LogicValue::Floating)
    }

    pub fn has_floating(&self) -> bool {
        self.bits.contains(&LogicValue::Floating)
    }

    pub fn has_error(&self) -> bool {
        self.bits.contains(&LogicValue::Error)
    }

    /// Contiguous sub-range `[start, start + len)`.
    pub fn slice(&self, start: usize, len: usize) -> Result<State> {
        let end = start + len;
        if end > self.width() {
            return Err(SimError::IndexOutOfRange {
                index: end.saturating_sub(1),
                width: self.width(),
            });
        }
        Ok(State::from_bits(self.bits[start..end].to_vec()))
    }

    fn check_int_width(width: usize) -> Result<()> {
        if width == 0 || width > MAX_INT_WIDTH {
            return Err(SimError::Configuration(format!(
                "integer conversion needs a width between 1 and {} bits, got {}",
                MAX_INT_WIDTH, width
            )));
        }
        Ok(())
    }

    /// Unsigned value of a definite state.
    pub fn to_unsigned(&self) -> Result<u64> {
        Self::check_int_width(self.width())?;
        let mut value = 0u64;
        for (i, bit) in self.bits.iter().enumerate() {
            if bit.to_bool()? {
                value |= 1 << i;
            }
        }
        Ok(value)
    }

    /// Two's-complement value of a definite state; the top bit is the sign.
    pub fn to_int(&self) -> Result<i64> {
        let raw = self.to_unsigned()?;
        let width = self.width();
        if width == MAX_INT_WIDTH {
            return Ok(raw as i64);
        }
        let sign = 1u64 << (width - 1);
        if raw & sign != 0 {
            Ok(raw as i64 - (1i64 << width))
        } else {
            Ok(raw as i64)
        }
    }

    pub fn from_unsigned(value: u64, width: usize) -> Result<State> {
        Self::check_int_width(width)?;
        if width < MAX_INT_WIDTH && value >> width != 0 {
            return Err(SimError::Range {
                value: value as i128,
                width,
            });
        }
        let bits = (0..width)
            .map(|i| LogicValue::from_bool(value >> i & 1 == 1))
            .collect();
        Ok(State { bits })
    }

    /// Two's-complement encoding; fails when `value` is outside
    /// `[-2^(width-1), 2^(width-1) - 1]`.
    pub fn from_int(value: i64, width: usize) -> Result<State> {
        Self::check_int_width(width)?;
        let min = -(1i128 << (width - 1));
        let max = (1i128 << (width - 1)) - 1;
        if (value as i128) < min || (value as i128) > max {
            return Err(SimError::Range {
                value: value as i128,
                width,
            });
        }
        let raw = if width == MAX_INT_WIDTH {
            value as u64
        } else {
            (value as u64) & ((1u64 << width) - 1)
        };
        Self::from_unsigned(raw, width)
    }

    /// MSB-first rendering using [`LogicValue::to_char`].
    pub fn to_binary_string(&self) -> String {
        self.bits.iter().rev().map(LogicValue::to_char).collect()
    }
}

impl Not for &State {
    type Output = State;

    /// Bitwise complement. A state with any Floating or Error bit has no
    /// definite complement and negates to all-Error.
    fn not(self) -> State {
        if !self.is_definite() {
            return State::error(self.width());
        }
        State {
            bits: self.bits.iter().map(|bit| !*bit).collect(),
        }
    }
}

impl Not for State {
    type Output = State;

    fn not(self) -> State {
        !&self
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_floating() {
            return write!(f, "Undefined");
        }
        if self.has_error() {
            return write!(f, "Error");
        }
        match (self.to_unsigned(), self.to_int()) {
            (Ok(unsigned), Ok(signed)) => write!(
                f,
                "{:x} = {} = {}",
                unsigned,
                signed,
                self.to_binary_string()
            ),
            _ => write!(f, "{}", self.to_binary_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LogicValue::*;

    #[test]
    fn test_logic_value_not() {
        assert_eq!(!Low, High);
        assert_eq!(!High, Low);
        assert_eq!(!Floating, Error);
        assert_eq!(!Error, Error);
    }

    #[test]
    fn test_to_bool_uses_runtime_variant() {
        assert!(!Low.to_bool().unwrap());
        assert!(High.to_bool().unwrap());
        assert!(matches!(Floating.to_bool(), Err(SimError::IndeterminateState)));
        assert!(matches!(Error.to_bool(), Err(SimError::IndeterminateState)));
    }

    #[test]
    fn test_state_creation() {
        let state = State::new(4);
        assert_eq!(state.width(), 4);
        assert!(state.is_all_floating());
        assert!(!state.is_definite());
        assert_eq!(State::low(3).bits(), &[Low, Low, Low]);
    }

    #[test]
    fn test_bounds_checked_access() {
        let mut state = State::low(2);
        assert_eq!(state.get(1).unwrap(), Low);
        assert!(matches!(
            state.get(2),
            Err(SimError::IndexOutOfRange { index: 2, width: 2 })
        ));
        assert!(state.set(5, High).is_err());
        state.set(1, High).unwrap();
        assert_eq!(state.get(1).unwrap(), High);
    }

    #[test]
    fn test_signed_conversion() {
        let state = State::from_int(-1, 4).unwrap();
        assert_eq!(state.bits(), &[High, High, High, High]);
        assert_eq!(state.to_int().unwrap(), -1);
        assert_eq!(state.to_unsigned().unwrap(), 15);

        assert_eq!(State::from_int(7, 4).unwrap().to_int().unwrap(), 7);
        assert_eq!(State::from_int(-8, 4).unwrap().to_int().unwrap(), -8);
        assert!(matches!(State::from_int(8, 4), Err(SimError::Range { .. })));
        assert!(matches!(State::from_int(-9, 4), Err(SimError::Range { .. })));
    }

    #[test]
    fn test_full_width_conversion() {
        let state = State::from_int(i64::MIN, 64).unwrap();
        assert_eq!(state.to_int().unwrap(), i64::MIN);
        let state = State::from_unsigned(u64::MAX, 64).unwrap();
        assert_eq!(state.to_int().unwrap(), -1);
    }

    #[test]
    fn test_unsigned_conversion() {
        assert_eq!(State::from_unsigned(10, 4).unwrap().bits(), &[Low, High, Low, High]);
        assert!(State::from_unsigned(16, 4).is_err());
    }

    #[test]
    fn test_indeterminate_conversion_fails() {
        let mut state = State::low(4);
        state.set(2, Floating).unwrap();
        assert!(matches!(state.to_int(), Err(SimError::IndeterminateState)));
        state.set(2, Error).unwrap();
        assert!(matches!(state.to_unsigned(), Err(SimError::IndeterminateState)));
    }

    #[test]
    fn test_negation() {
        let state = State::from_int(5, 4).unwrap();
        assert_eq!((!&state).to_unsigned().unwrap(), 10);
        assert_eq!(!!state.clone(), state);

        let mut partial = State::low(4);
        partial.set(0, Floating).unwrap();
        assert_eq!(!partial, State::error(4));
    }

    #[test]
    fn test_slice() {
        let state = State::from_unsigned(0b1100, 4).unwrap();
        assert_eq!(state.slice(2, 2).unwrap().to_unsigned().unwrap(), 0b11);
        assert!(state.slice(3, 2).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(State::new(2).to_string(), "Undefined");
        assert_eq!(State::error(2).to_string(), "Error");
        assert_eq!(State::from_int(-2, 4).unwrap().to_string(), "e = -2 = 1110");
        assert_eq!(State::from_unsigned(5, 4).unwrap().to_string(), "5 = 5 = 0101");
    }
}
