//! Integration tests
//!
//! These tests wire several components into small circuits and check the
//! behaviour that only shows up once signals propagate between them.

use rusty_logic::components::*;
use rusty_logic::persistence::{JsonRamDump, RamStore};
use rusty_logic::{Circuit, ComponentId, Edge, LogicValue, SimError, State, DEFAULT_MAX_DEPTH};
use std::rc::Rc;

#[cfg(test)]
mod propagation_tests {
    use super::*;

    /// Accumulator: `acc <- acc + 1` on every falling edge of `clk`.
    fn accumulator(width: usize) -> (Circuit, ComponentId, ComponentId) {
        let mut circuit = Circuit::new("accumulator");
        let clock = circuit.add(Clock::new("clock", 1).unwrap());
        let enable = circuit.add(Constant::filled("enable", 1, LogicValue::High).unwrap());
        let zero = circuit.add(Constant::from_int("zero", 0, 1).unwrap());
        let mode = circuit.add(Constant::from_int("mode", 0, 2).unwrap());
        let one = circuit.add(Constant::from_int("one", 1, width).unwrap());
        let acc = circuit.add(Register::new("acc", width, Edge::Falling).unwrap());
        let alu = circuit.add(Alu::new("alu", width).unwrap());

        let wire = |circuit: &mut Circuit, from: (ComponentId, &str), to: &[(ComponentId, &str)]| {
            let from = circuit.port(from.0, from.1).unwrap();
            for (component, port) in to {
                let to = circuit.port(*component, port).unwrap();
                circuit.connect(from, to).unwrap();
            }
        };
        wire(&mut circuit, (clock, "CLK"), &[(acc, "C")]);
        wire(&mut circuit, (enable, "O"), &[(acc, "WE"), (acc, "OE")]);
        wire(&mut circuit, (zero, "O"), &[(alu, "CIN")]);
        wire(&mut circuit, (mode, "O"), &[(alu, "M")]);
        wire(&mut circuit, (one, "O"), &[(alu, "B")]);
        wire(&mut circuit, (acc, "Q"), &[(alu, "A")]);
        wire(&mut circuit, (alu, "OUT"), &[(acc, "D")]);

        circuit.push_all().unwrap();
        circuit
            .control::<Clock, _, _>(clock, |clock, out| {
                clock.start(out);
                Ok(())
            })
            .unwrap();
        (circuit, acc, alu)
    }

    #[test]
    fn test_register_feedback_settles() {
        let (mut circuit, acc, _) = accumulator(8);
        circuit.step(10).unwrap();
        let stored = circuit.component::<Register>(acc).unwrap().stored();
        assert_eq!(stored.to_unsigned().unwrap(), 5);
    }

    #[test]
    fn test_accumulator_wraps_with_carry() {
        let (mut circuit, acc, alu) = accumulator(4);
        circuit.step(30).unwrap();
        let stored = circuit.component::<Register>(acc).unwrap().stored();
        assert_eq!(stored.to_unsigned().unwrap(), 15);

        circuit.step(2).unwrap();
        let stored = circuit.component::<Register>(acc).unwrap().stored();
        assert_eq!(stored.to_unsigned().unwrap(), 0);
        let carry = circuit.port(alu, "COUT").unwrap();
        assert_eq!(circuit.port_state(carry).unwrap(), &State::bit(LogicValue::Low));
    }

    #[test]
    fn test_ring_oscillator_is_a_cycle() {
        let mut circuit = Circuit::new("ring");
        let gates: Vec<ComponentId> = (0..3)
            .map(|i| circuit.add(NotGate::new(format!("n{}", i), 1).unwrap()))
            .collect();
        for i in 0..3 {
            let from = circuit.port(gates[i], "O").unwrap();
            let to = circuit.port(gates[(i + 1) % 3], "I").unwrap();
            circuit.connect(from, to).unwrap();
        }

        let start = circuit.port(gates[0], "I").unwrap();
        let err = circuit.set_input(start, State::bit(LogicValue::Low)).unwrap_err();
        assert!(matches!(
            err,
            SimError::CycleDetected { depth, .. } if depth == DEFAULT_MAX_DEPTH + 1
        ));
        // Nothing of the failed wave survives.
        for (_, bus) in circuit.buses() {
            assert!(bus.state().is_all_floating());
        }
    }

    #[test]
    fn test_cross_coupled_inverters_settle() {
        let mut circuit = Circuit::new("latch");
        let a = circuit.add(NotGate::new("a", 1).unwrap());
        let b = circuit.add(NotGate::new("b", 1).unwrap());
        let q = circuit
            .connect(circuit.port(a, "O").unwrap(), circuit.port(b, "I").unwrap())
            .unwrap();
        let qn = circuit
            .connect(circuit.port(b, "O").unwrap(), circuit.port(a, "I").unwrap())
            .unwrap();

        circuit
            .set_input(circuit.port(a, "I").unwrap(), State::bit(LogicValue::Low))
            .unwrap();
        assert_eq!(circuit.bus_state(q).unwrap(), &State::bit(LogicValue::High));
        assert_eq!(circuit.bus_state(qn).unwrap(), &State::bit(LogicValue::Low));
    }

    #[test]
    fn test_failed_wave_rolls_back_every_component() {
        let (mut circuit, acc, alu) = accumulator(8);
        circuit.step(4).unwrap();
        let before = circuit.component::<Register>(acc).unwrap().stored().clone();
        let time = circuit.time();

        let mode = circuit.port(alu, "M").unwrap();
        let mode_bus = circuit.port_state(mode).unwrap().clone();
        assert_eq!(mode_bus.to_unsigned().unwrap(), 0);

        // Mode 3 is unsupported; the whole push is undone.
        let err = circuit
            .set_input(mode, State::from_unsigned(3, 2).unwrap())
            .unwrap_err();
        assert!(matches!(err, SimError::UnsupportedMode(3)));
        assert_eq!(circuit.port_state(mode).unwrap(), &mode_bus);
        assert_eq!(circuit.component::<Register>(acc).unwrap().stored(), &before);
        assert_eq!(circuit.time(), time);
    }
}

#[cfg(test)]
mod contention_tests {
    use super::*;

    #[test]
    fn test_second_driver_collapses_bus() {
        let mut circuit = Circuit::new("contention");
        let first = circuit.add(Constant::from_int("first", 5, 4).unwrap());
        let second = circuit.add(Constant::from_int("second", 5, 4).unwrap());
        let monitor = circuit.add(Readout::new("monitor", 4).unwrap());
        let bus = circuit.add_bus("shared", 4).unwrap();
        circuit.attach(circuit.port(first, "O").unwrap(), bus).unwrap();
        circuit.attach(circuit.port(second, "O").unwrap(), bus).unwrap();
        circuit.attach(circuit.port(monitor, "I").unwrap(), bus).unwrap();

        circuit.push(first).unwrap();
        assert_eq!(circuit.bus_state(bus).unwrap().to_unsigned().unwrap(), 5);

        // Same value, different driver: still contention.
        circuit.push(second).unwrap();
        assert_eq!(circuit.bus_state(bus).unwrap(), &State::error(4));
        assert!(circuit.bus(bus).unwrap().is_contended());
        assert_eq!(
            circuit.component::<Readout>(monitor).unwrap().last(),
            Some("monitor: Error")
        );

        circuit.release(bus).unwrap();
        assert!(circuit.bus_state(bus).unwrap().is_all_floating());
        circuit.push(second).unwrap();
        assert_eq!(circuit.bus_state(bus).unwrap().to_unsigned().unwrap(), 5);
    }

    #[test]
    fn test_tristate_buffers_share_a_bus() {
        let mut circuit = Circuit::new("shared");
        let left = circuit.add(ControlledBuffer::new("left", 4).unwrap());
        let right = circuit.add(ControlledBuffer::new("right", 4).unwrap());
        let bus = circuit.add_bus("data", 4).unwrap();
        circuit.attach(circuit.port(left, "O").unwrap(), bus).unwrap();
        circuit.attach(circuit.port(right, "O").unwrap(), bus).unwrap();

        let left_enable = circuit.port(left, "E").unwrap();
        let right_enable = circuit.port(right, "E").unwrap();
        circuit
            .set_input(circuit.port(left, "I").unwrap(), State::from_unsigned(3, 4).unwrap())
            .unwrap();
        circuit
            .set_input(circuit.port(right, "I").unwrap(), State::from_unsigned(12, 4).unwrap())
            .unwrap();

        circuit.set_input(left_enable, State::bit(LogicValue::High)).unwrap();
        assert_eq!(circuit.bus_state(bus).unwrap().to_unsigned().unwrap(), 3);

        // Handing the bus over through Floating is not contention.
        circuit.set_input(left_enable, State::bit(LogicValue::Low)).unwrap();
        circuit.set_input(right_enable, State::bit(LogicValue::High)).unwrap();
        assert_eq!(circuit.bus_state(bus).unwrap().to_unsigned().unwrap(), 12);
        assert!(!circuit.bus(bus).unwrap().is_contended());
    }
}

#[cfg(test)]
mod memory_tests {
    use super::*;

    fn write_word(circuit: &mut Circuit, ram: ComponentId, address: u64, value: u64) {
        let a = circuit.port(ram, "A").unwrap();
        let input = circuit.port(ram, "IN").unwrap();
        let we = circuit.port(ram, "WE").unwrap();
        let c = circuit.port(ram, "C").unwrap();
        circuit.set_input(a, State::from_unsigned(address, 4).unwrap()).unwrap();
        circuit.set_input(input, State::from_unsigned(value, 8).unwrap()).unwrap();
        circuit.set_input(we, State::bit(LogicValue::High)).unwrap();
        circuit.set_input(c, State::bit(LogicValue::Low)).unwrap();
        circuit.set_input(c, State::bit(LogicValue::High)).unwrap();
        circuit.set_input(we, State::bit(LogicValue::Low)).unwrap();
    }

    #[test]
    fn test_non_volatile_ram_survives_rebuild() {
        let dir = tempfile::tempdir().unwrap();
        let store: Rc<dyn RamStore> = Rc::new(JsonRamDump::new(dir.path().join("ram_dump.json")));

        let mut circuit = Circuit::new("first run");
        let ram = circuit.add(
            Ram::non_volatile("ram", 4, 8, Edge::Rising, false, "scratch", store.clone()).unwrap(),
        );
        write_word(&mut circuit, ram, 3, 0xBE);

        let mut circuit = Circuit::new("second run");
        let ram = circuit.add(
            Ram::non_volatile("ram", 4, 8, Edge::Rising, true, "scratch", store.clone()).unwrap(),
        );
        circuit
            .set_input(circuit.port(ram, "OE").unwrap(), State::bit(LogicValue::High))
            .unwrap();
        circuit
            .set_input(circuit.port(ram, "A").unwrap(), State::from_unsigned(3, 4).unwrap())
            .unwrap();
        let out = circuit.port(ram, "OUT").unwrap();
        assert_eq!(circuit.port_state(out).unwrap().to_unsigned().unwrap(), 0xBE);

        // Another key starts out all-Low.
        let other = Ram::non_volatile("ram", 4, 8, Edge::Rising, false, "other", store).unwrap();
        assert!(other.words().iter().all(|word| *word == State::low(8)));
    }

    #[test]
    fn test_reset_is_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store: Rc<dyn RamStore> = Rc::new(JsonRamDump::new(dir.path().join("ram_dump.json")));
        let mut circuit = Circuit::new("reset");
        let ram = circuit.add(
            Ram::non_volatile("ram", 4, 8, Edge::Rising, false, "scratch", store.clone()).unwrap(),
        );
        write_word(&mut circuit, ram, 1, 7);
        circuit
            .set_input(circuit.port(ram, "R").unwrap(), State::bit(LogicValue::High))
            .unwrap();
        assert_eq!(store.fetch("scratch").unwrap(), Some(vec![0; 16]));
    }

    #[test]
    fn test_rom_feeds_register() {
        let mut circuit = Circuit::new("fetch");
        let rom = circuit.add(Rom::from_values("rom", 2, 8, &[0x11, 0x22, 0x33, 0x44]).unwrap());
        let ir = circuit.add(Register::new("ir", 8, Edge::Rising).unwrap());
        circuit
            .connect(circuit.port(rom, "O").unwrap(), circuit.port(ir, "D").unwrap())
            .unwrap();
        circuit
            .set_input(circuit.port(rom, "OE").unwrap(), State::bit(LogicValue::High))
            .unwrap();
        circuit
            .set_input(circuit.port(rom, "A").unwrap(), State::from_unsigned(2, 2).unwrap())
            .unwrap();
        circuit
            .set_input(circuit.port(ir, "WE").unwrap(), State::bit(LogicValue::High))
            .unwrap();
        let c = circuit.port(ir, "C").unwrap();
        circuit.set_input(c, State::bit(LogicValue::Low)).unwrap();
        circuit.set_input(c, State::bit(LogicValue::High)).unwrap();
        assert_eq!(
            circuit.component::<Register>(ir).unwrap().stored().to_unsigned().unwrap(),
            0x33
        );
    }
}

#[cfg(test)]
mod routing_tests {
    use super::*;

    #[test]
    fn test_multiplexer_selector_floating_wins() {
        let mut circuit = Circuit::new("mux");
        let mux = circuit.add(Multiplexer::new("mux", 1, 4).unwrap());
        let a = State::from_unsigned(0b1010, 4).unwrap();
        let b = State::from_unsigned(0b0101, 4).unwrap();
        circuit.set_input(circuit.port(mux, "I0").unwrap(), a.clone()).unwrap();
        circuit.set_input(circuit.port(mux, "I1").unwrap(), b).unwrap();
        let selector = circuit.port(mux, "S").unwrap();
        let output = circuit.port(mux, "O").unwrap();

        circuit.set_input(selector, State::bit(LogicValue::Low)).unwrap();
        assert_eq!(circuit.port_state(output).unwrap(), &a);
        circuit.set_input(selector, State::bit(LogicValue::Floating)).unwrap();
        assert!(circuit.port_state(output).unwrap().is_all_floating());
    }

    #[test]
    fn test_splitter_feeds_gate() {
        let mut circuit = Circuit::new("split");
        let mut splitter = Splitter::new("split", 2).unwrap();
        splitter.add_input(vec![0, 1]).unwrap();
        splitter.add_output(vec![0]).unwrap();
        splitter.add_output(vec![1]).unwrap();
        let split = circuit.add(splitter);
        let and = circuit.add(Gate::new("and", GateKind::And, 1, 2).unwrap());
        circuit
            .connect(circuit.port(split, "OUT0").unwrap(), circuit.port(and, "I0").unwrap())
            .unwrap();
        circuit
            .connect(circuit.port(split, "OUT1").unwrap(), circuit.port(and, "I1").unwrap())
            .unwrap();

        let input = circuit.port(split, "IN0").unwrap();
        let output = circuit.port(and, "O").unwrap();
        circuit.set_input(input, State::from_unsigned(3, 2).unwrap()).unwrap();
        assert_eq!(circuit.port_state(output).unwrap(), &State::bit(LogicValue::High));
        circuit.set_input(input, State::from_unsigned(1, 2).unwrap()).unwrap();
        assert_eq!(circuit.port_state(output).unwrap(), &State::bit(LogicValue::Low));
    }
}
