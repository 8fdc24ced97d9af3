use crate::error::{Result, SimError};
use std::fmt;

/// Index of a component inside its [`Circuit`](crate::circuit::Circuit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) usize);

/// Index of a bus inside its [`Circuit`](crate::circuit::Circuit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BusId(pub(crate) usize);

/// Index of a port inside its component's port table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PortId(pub(crate) usize);

/// A port addressed from outside its component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub component: ComponentId,
    pub port: PortId,
}

impl ComponentId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl BusId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl PortId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl PortRef {
    pub fn new(component: ComponentId, port: PortId) -> Self {
        PortRef { component, port }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.component.0, self.port.0)
    }
}

/// A named, sized end of a connection, used to report mismatches.
#[derive(Debug, Clone)]
pub struct Endpoint<'a> {
    pub name: &'a str,
    pub width: usize,
}

impl<'a> Endpoint<'a> {
    pub fn new(name: &'a str, width: usize) -> Self {
        Endpoint { name, width }
    }
}

/// Eager width check performed whenever two endpoints are connected.
pub fn check_widths(left: &Endpoint<'_>, right: &Endpoint<'_>) -> Result<()> {
    if left.width != right.width {
        return Err(SimError::WidthMismatch {
            left: left.name.to_string(),
            left_width: left.width,
            right: right.name.to_string(),
            right_width: right.width,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_widths() {
        assert!(check_widths(&Endpoint::new("a", 8), &Endpoint::new("b", 8)).is_ok());
    }

    #[test]
    fn test_mismatch_names_both_endpoints() {
        let err = check_widths(&Endpoint::new("reg.Q", 8), &Endpoint::new("d_bus", 4)).unwrap_err();
        match err {
            SimError::WidthMismatch {
                left,
                left_width,
                right,
                right_width,
            } => {
                assert_eq!(left, "reg.Q");
                assert_eq!(left_width, 8);
                assert_eq!(right, "d_bus");
                assert_eq!(right_width, 4);
            }
            other => panic!("unexpected error {:?}", other),
        }
        let message =
            check_widths(&Endpoint::new("reg.Q", 8), &Endpoint::new("d_bus", 4)).unwrap_err();
        assert_eq!(
            message.to_string(),
            "Width 8 of reg.Q does not match width 4 of d_bus"
        );
    }
}
