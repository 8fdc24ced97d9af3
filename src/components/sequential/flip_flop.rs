use crate::component::{BaseComponent, Component, Outputs};
use crate::connection::PortId;
use crate::error::Result;
use crate::port::Edge;
use crate::signal::{LogicValue, State};
use serde::{Deserialize, Serialize};

/// Next-state rule of a flip-flop variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipFlopKind {
    D,
    T,
    JK,
    SR,
}

impl FlipFlopKind {
    /// Data input names, in the order [`FlipFlopKind::next_state`] expects them.
    pub fn data_inputs(&self) -> &'static [&'static str] {
        match self {
            FlipFlopKind::D => &["D"],
            FlipFlopKind::T => &["T"],
            FlipFlopKind::JK => &["J", "K"],
            FlipFlopKind::SR => &["S", "R"],
        }
    }

    /// Stored bit after an active clock, from the previous bit and the data
    /// inputs. Indeterminate data, and S=R=High, store Error.
    pub fn next_state(&self, previous: LogicValue, data: &[LogicValue]) -> LogicValue {
        if data.iter().any(|value| !value.is_definite()) {
            return LogicValue::Error;
        }
        let high = |i: usize| data.get(i) == Some(&LogicValue::High);
        match self {
            FlipFlopKind::D => data.first().copied().unwrap_or(LogicValue::Error),
            FlipFlopKind::T if high(0) => !previous,
            FlipFlopKind::T => previous,
            FlipFlopKind::JK => match (high(0), high(1)) {
                (true, true) => !previous,
                (true, false) => LogicValue::High,
                (false, true) => LogicValue::Low,
                (false, false) => previous,
            },
            FlipFlopKind::SR => match (high(0), high(1)) {
                (true, true) => LogicValue::Error,
                (true, false) => LogicValue::High,
                (false, true) => LogicValue::Low,
                (false, false) => previous,
            },
        }
    }
}

/// One-bit storage element. `RST` and `SET` act immediately (reset wins),
/// otherwise the stored bit follows the variant's rule while `C` is active.
#[derive(Debug, Clone)]
pub struct FlipFlop {
    base: BaseComponent,
    kind: FlipFlopKind,
    stored: LogicValue,
    set: PortId,
    reset: PortId,
    clock: PortId,
    data: Vec<PortId>,
    q: PortId,
    qn: PortId,
}

impl FlipFlop {
    pub fn new(name: impl Into<String>, kind: FlipFlopKind, clock_edge: Edge) -> Result<Self> {
        let mut base = BaseComponent::new(name);
        let set = base.add_trigger("SET", Edge::High);
        let reset = base.add_trigger("RST", Edge::High);
        let clock = base.add_trigger("C", clock_edge);
        let data = kind
            .data_inputs()
            .iter()
            .map(|name| base.add_input(*name, 1))
            .collect();
        let q = base.add_output("Q", 1);
        let qn = base.add_output("QN", 1);
        Ok(FlipFlop {
            base,
            kind,
            stored: LogicValue::Low,
            set,
            reset,
            clock,
            data,
            q,
            qn,
        })
    }

    pub fn kind(&self) -> FlipFlopKind {
        self.kind
    }

    pub fn stored(&self) -> LogicValue {
        self.stored
    }

    fn emit(&self, out: &mut Outputs) {
        out.drive(self.q, State::bit(self.stored));
        out.drive(self.qn, State::bit(!self.stored));
    }
}

impl Component for FlipFlop {
    fn base(&self) -> &BaseComponent {
        &self.base
    }

    fn base_mut(&mut self) -> &mut BaseComponent {
        &mut self.base
    }

    fn react(&mut self, _port: PortId, out: &mut Outputs) -> Result<()> {
        if self.base.is_active(self.reset) {
            self.stored = LogicValue::Low;
        } else if self.base.is_active(self.set) {
            self.stored = LogicValue::High;
        } else if self.base.is_active(self.clock) {
            let data: Vec<LogicValue> = self.data.iter().map(|port| self.base.value(*port)).collect();
            self.stored = self.kind.next_state(self.stored, &data);
        }
        self.emit(out);
        Ok(())
    }

    fn push(&mut self, out: &mut Outputs) -> Result<()> {
        self.emit(out);
        Ok(())
    }
}
