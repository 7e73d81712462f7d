mod common;

use common::*;
use pwrmgr::fault::FaultClass;
use pwrmgr::monitor::{FaultMonitor, PowerState, SequencerMonitor, SequencerRail};
use pwrmgr::pmbus::{status_vout_page, status_word, STATUS_WORD};
use pwrmgr::sim::SimulatedBus;
use tokio::time::Instant;

fn rails() -> Vec<SequencerRail> {
    vec![
        SequencerRail {
            name: "vdd_cpu0".to_string(),
            page: 0,
        },
        SequencerRail {
            name: "vcs_cpu0".to_string(),
            page: 1,
        },
        SequencerRail {
            name: "vddr".to_string(),
            page: 5,
        },
    ]
}

fn powered_sequencer(bus: &SimulatedBus) -> SequencerMonitor {
    let mut sequencer = SequencerMonitor::new("ucd90320", boxed(bus, "ucd90320"), rails(), &settings());
    let start = Instant::now();
    sequencer.power_state_changed(true, start);
    sequencer.timer_expired(start + DEBOUNCE);
    sequencer
}

#[test]
fn test_sequencer_always_present() {
    let bus = SimulatedBus::new();
    let mut sequencer = SequencerMonitor::new("ucd90320", boxed(&bus, "ucd90320"), rails(), &settings());
    let mut sink = RecordingSink::new();
    assert_eq!(sequencer.state(), PowerState::PresentPowerOffDebounce);

    sequencer.presence_changed(false, Instant::now(), &mut sink);
    assert_eq!(sequencer.state(), PowerState::PresentPowerOffDebounce);
    assert!(sink.presence.is_empty());
}

#[test]
fn test_failing_rail_identified() {
    let bus = SimulatedBus::new();
    let mut sequencer = powered_sequencer(&bus);
    let mut sink = RecordingSink::new();
    bus.set_register("ucd90320", STATUS_WORD, status_word::POWER_GOOD_NEGATED);
    bus.set_register("ucd90320", &status_vout_page(5), 0x10);

    for _ in 0..3 {
        sequencer.analyze(&mut sink).unwrap();
    }

    assert_eq!(sink.classes(), vec![FaultClass::PowerGood]);
    let record = &sink.faults[0];
    assert_eq!(record.rail.as_deref(), Some("vddr"));
    assert_eq!(record.status_word, Some(status_word::POWER_GOOD_NEGATED));
    assert_eq!(record.snapshot.len(), 3);
    assert!(sequencer.fault_reported());

    sequencer.analyze(&mut sink).unwrap();
    assert_eq!(sink.faults.len(), 1);
}

#[test]
fn test_failing_rail_beyond_snapshot_capacity() {
    let bus = SimulatedBus::new();
    let rails: Vec<SequencerRail> = (0..12)
        .map(|page| SequencerRail {
            name: format!("rail{page}"),
            page,
        })
        .collect();
    let mut sequencer = SequencerMonitor::new("ucd90320", boxed(&bus, "ucd90320"), rails, &settings());
    let start = Instant::now();
    sequencer.power_state_changed(true, start);
    sequencer.timer_expired(start + DEBOUNCE);

    let mut sink = RecordingSink::new();
    bus.set_register("ucd90320", STATUS_WORD, status_word::POWER_GOOD_NEGATED);
    bus.set_register("ucd90320", &status_vout_page(10), 0x10);

    for _ in 0..3 {
        sequencer.analyze(&mut sink).unwrap();
    }

    assert_eq!(sink.classes(), vec![FaultClass::PowerGood]);
    let record = &sink.faults[0];
    assert_eq!(record.rail.as_deref(), Some("rail10"));
    assert!(record.message.is_none());
    assert_eq!(record.snapshot.len(), 8);
    assert_eq!(record.snapshot[0].command, status_vout_page(10));
    assert_eq!(record.snapshot[0].value, 0x10);
    assert_eq!(bus.read_count("ucd90320", &status_vout_page(11)), 1);
}

#[test]
fn test_pgood_without_rail_fault() {
    let bus = SimulatedBus::new();
    let mut sequencer = powered_sequencer(&bus);
    let mut sink = RecordingSink::new();
    bus.set_register("ucd90320", STATUS_WORD, status_word::POWER_GOOD_NEGATED);

    for _ in 0..3 {
        sequencer.analyze(&mut sink).unwrap();
    }

    assert_eq!(sink.faults.len(), 1);
    assert_eq!(sink.faults[0].rail, None);
    assert!(sink.faults[0].message.is_some());
}

#[test]
fn test_sequencer_read_failure_and_clear() {
    let bus = SimulatedBus::new();
    let mut sequencer = powered_sequencer(&bus);
    let mut sink = RecordingSink::new();
    bus.fail_reads("ucd90320", None);

    sequencer.analyze(&mut sink).unwrap();
    sequencer.analyze(&mut sink).unwrap();
    assert_eq!(sink.classes(), vec![FaultClass::ReadFailure]);
    assert!(sequencer.read_failure_logged());

    sequencer.clear_faults();
    assert!(!sequencer.read_failure_logged());
    sequencer.analyze(&mut sink).unwrap();
    assert_eq!(sink.count(FaultClass::ReadFailure), 2);
}

#[test]
fn test_sequencer_idle_while_power_off() {
    let bus = SimulatedBus::new();
    let mut sequencer = SequencerMonitor::new("ucd90320", boxed(&bus, "ucd90320"), rails(), &settings());
    let mut sink = RecordingSink::new();
    bus.set_register("ucd90320", STATUS_WORD, status_word::POWER_GOOD_NEGATED);

    for _ in 0..5 {
        sequencer.analyze(&mut sink).unwrap();
    }

    assert!(sink.faults.is_empty());
    assert_eq!(bus.read_count("ucd90320", STATUS_WORD), 0);
}
