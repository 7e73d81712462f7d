mod common;

use common::*;
use pwrmgr::fault::FaultClass;
use pwrmgr::monitor::{FaultMonitor, PowerState, PowerSupply};
use pwrmgr::pmbus::{status_word, ON_OFF_CONFIG, READ_VIN, STATUS_INPUT, STATUS_WORD};
use pwrmgr::sim::SimulatedBus;
use tokio::time::{Duration, Instant};

#[test]
fn test_power_supply_starts_absent() {
    let bus = SimulatedBus::new();
    let psu = PowerSupply::new("psu0", INVENTORY_PATH, boxed(&bus, "psu0"), &settings());

    assert_eq!(psu.state(), PowerState::Absent);
    assert!(!psu.present());
    assert!(!psu.powered_on());
    assert!(!psu.power_on_fault_reported());
    assert!(!psu.read_failure_logged());
    assert!(!psu.latches().any());
}

#[test]
fn test_presence_publishes_and_configures_control_pin() {
    let bus = SimulatedBus::new();
    let mut psu = PowerSupply::new("psu0", INVENTORY_PATH, boxed(&bus, "psu0"), &settings());
    let mut sink = RecordingSink::new();

    psu.presence_changed(true, Instant::now(), &mut sink);

    assert_eq!(psu.state(), PowerState::PresentPowerOffDebounce);
    assert_eq!(sink.presence, vec![(INVENTORY_PATH.to_string(), true)]);
    assert_eq!(bus.register("psu0", ON_OFF_CONFIG), Some(0x18));
    // clear faults on insertion reads an input sensor
    assert_eq!(bus.read_count("psu0", READ_VIN), 1);

    // a repeated notification is not a transition
    psu.presence_changed(true, Instant::now(), &mut sink);
    assert_eq!(sink.presence.len(), 1);
}

#[test]
fn test_analyze_ignored_until_powered_on() {
    let bus = SimulatedBus::new();
    let mut psu = PowerSupply::new("psu0", INVENTORY_PATH, boxed(&bus, "psu0"), &settings());
    let mut sink = RecordingSink::new();
    set_status(&bus, "psu0", status_word::VIN_UV_FAULT);

    let start = Instant::now();
    psu.presence_changed(true, start, &mut sink);
    psu.power_state_changed(true, start);
    psu.analyze(&mut sink).unwrap();

    assert_eq!(bus.read_count("psu0", STATUS_WORD), 0);
    assert!(sink.faults.is_empty());
}

#[test]
fn test_undervoltage_logged_once_until_cleared() {
    let bus = SimulatedBus::new();
    let (mut psu, mut sink) = powered_psu(&bus, "psu0");
    set_status(&bus, "psu0", status_word::VIN_UV_FAULT);

    psu.analyze(&mut sink).unwrap();
    assert_eq!(sink.classes(), vec![FaultClass::InputUndervoltage]);
    assert!(psu.is_latched(FaultClass::InputUndervoltage));
    assert_eq!(psu.latches().latched().count(), 1);

    psu.analyze(&mut sink).unwrap();
    psu.analyze(&mut sink).unwrap();
    assert_eq!(sink.faults.len(), 1);

    psu.clear_faults();
    psu.analyze(&mut sink).unwrap();
    assert_eq!(sink.count(FaultClass::InputUndervoltage), 2);
}

#[test]
fn test_clear_faults_then_healthy_poll() {
    let bus = SimulatedBus::new();
    let (mut psu, mut sink) = powered_psu(&bus, "psu0");
    set_status(&bus, "psu0", status_word::FAN_FAULT | status_word::TEMPERATURE_FAULT_WARN);
    psu.analyze(&mut sink).unwrap();
    assert!(psu.latches().any());

    set_status(&bus, "psu0", 0);
    psu.clear_faults();
    psu.analyze(&mut sink).unwrap();

    assert!(!psu.latches().any());
    assert!(psu.present());
    assert!(psu.powered_on());
}

#[test]
fn test_fault_record_contents() {
    let bus = SimulatedBus::new();
    let (mut psu, mut sink) = powered_psu(&bus, "psu0");
    let status = status_word::INPUT_FAULT_WARN | status_word::TEMPERATURE_FAULT_WARN;
    set_status(&bus, "psu0", status);
    bus.set_register("psu0", STATUS_INPUT, 0x10);

    psu.analyze(&mut sink).unwrap();

    assert_eq!(sink.classes(), vec![FaultClass::Input, FaultClass::Temperature]);
    let input = &sink.faults[0];
    assert_eq!(input.device, "psu0");
    assert_eq!(input.status_word, Some(status));
    assert_eq!(input.callout, None);
    assert!(input
        .snapshot
        .iter()
        .any(|reading| reading.command == STATUS_INPUT && reading.value == 0x10));

    let temperature = &sink.faults[1];
    assert_eq!(temperature.callout.as_deref(), Some(INVENTORY_PATH));
}

#[test]
fn test_every_status_bit_maps_to_a_class() {
    let cases = [
        (status_word::VIN_UV_FAULT, FaultClass::InputUndervoltage),
        (status_word::INPUT_FAULT_WARN, FaultClass::Input),
        (status_word::IOUT_OC_FAULT, FaultClass::OutputOvercurrent),
        (status_word::VOUT_OV_FAULT, FaultClass::OutputOvervoltage),
        (status_word::FAN_FAULT, FaultClass::Fan),
        (status_word::TEMPERATURE_FAULT_WARN, FaultClass::Temperature),
        (status_word::CML_FAULT, FaultClass::Communication),
        (status_word::MFR_SPECIFIC_FAULT, FaultClass::Manufacturer),
    ];
    for (bit, class) in cases {
        let bus = SimulatedBus::new();
        let (mut psu, mut sink) = powered_psu(&bus, "psu0");
        set_status(&bus, "psu0", bit);
        psu.analyze(&mut sink).unwrap();
        assert_eq!(sink.classes(), vec![class], "bit {:#06x}", bit);
    }
}

#[test]
fn test_pgood_needs_consecutive_polls() {
    let bus = SimulatedBus::new();
    let (mut psu, mut sink) = powered_psu(&bus, "psu0");
    set_status(&bus, "psu0", status_word::POWER_GOOD_NEGATED);

    psu.analyze(&mut sink).unwrap();
    psu.analyze(&mut sink).unwrap();
    assert!(sink.faults.is_empty());

    // a clean poll restarts the count
    set_status(&bus, "psu0", 0);
    psu.analyze(&mut sink).unwrap();
    set_status(&bus, "psu0", status_word::UNIT_IS_OFF);
    psu.analyze(&mut sink).unwrap();
    psu.analyze(&mut sink).unwrap();
    assert!(sink.faults.is_empty());

    psu.analyze(&mut sink).unwrap();
    assert_eq!(sink.classes(), vec![FaultClass::PowerGood]);
    assert!(psu.power_on_fault_reported());

    psu.analyze(&mut sink).unwrap();
    assert_eq!(sink.faults.len(), 1);
}

#[test]
fn test_pgood_ordering_with_output_faults() {
    let bus = SimulatedBus::new();
    let (mut psu, mut sink) = powered_psu(&bus, "psu0");
    set_status(
        &bus,
        "psu0",
        status_word::POWER_GOOD_NEGATED | status_word::VOUT_OV_FAULT | status_word::IOUT_OC_FAULT,
    );

    psu.analyze(&mut sink).unwrap();
    psu.analyze(&mut sink).unwrap();
    assert!(sink.faults.is_empty());

    psu.analyze(&mut sink).unwrap();
    assert_eq!(
        sink.classes(),
        vec![
            FaultClass::PowerGood,
            FaultClass::OutputOvercurrent,
            FaultClass::OutputOvervoltage
        ]
    );

    // within the poll that reports it, PGOOD comes first
    let bus = SimulatedBus::new();
    let (mut psu, mut sink) = powered_psu(&bus, "psu1");
    set_status(&bus, "psu1", status_word::UNIT_IS_OFF);
    psu.analyze(&mut sink).unwrap();
    psu.analyze(&mut sink).unwrap();
    set_status(&bus, "psu1", status_word::UNIT_IS_OFF | status_word::VOUT_OV_FAULT);
    psu.analyze(&mut sink).unwrap();
    assert_eq!(sink.classes(), vec![FaultClass::PowerGood, FaultClass::OutputOvervoltage]);
}

#[test]
fn test_output_fault_reported_after_pgood_glitch() {
    let bus = SimulatedBus::new();
    let (mut psu, mut sink) = powered_psu(&bus, "psu0");
    set_status(&bus, "psu0", status_word::POWER_GOOD_NEGATED | status_word::IOUT_OC_FAULT);
    psu.analyze(&mut sink).unwrap();
    assert!(sink.faults.is_empty());

    set_status(&bus, "psu0", status_word::IOUT_OC_FAULT);
    psu.analyze(&mut sink).unwrap();
    assert_eq!(sink.classes(), vec![FaultClass::OutputOvercurrent]);
    assert!(!psu.power_on_fault_reported());
}

#[test]
fn test_read_failure_logged_once_per_episode() {
    let bus = SimulatedBus::new();
    let (mut psu, mut sink) = powered_psu(&bus, "psu0");
    set_status(&bus, "psu0", status_word::FAN_FAULT);
    bus.fail_reads("psu0", Some(STATUS_WORD));

    psu.analyze(&mut sink).unwrap();
    psu.analyze(&mut sink).unwrap();
    assert_eq!(sink.classes(), vec![FaultClass::ReadFailure]);
    assert!(psu.read_failure_logged());
    assert!(!psu.is_latched(FaultClass::Fan));

    // recovery ends the episode and bit evaluation resumes
    bus.restore("psu0");
    psu.analyze(&mut sink).unwrap();
    assert!(!psu.read_failure_logged());
    assert_eq!(sink.classes(), vec![FaultClass::ReadFailure, FaultClass::Fan]);

    bus.fail_reads("psu0", Some(STATUS_WORD));
    psu.analyze(&mut sink).unwrap();
    assert_eq!(sink.count(FaultClass::ReadFailure), 2);
}

#[test]
fn test_snapshot_skips_unreadable_registers() {
    let bus = SimulatedBus::new();
    let (mut psu, mut sink) = powered_psu(&bus, "psu0");
    set_status(&bus, "psu0", status_word::INPUT_FAULT_WARN);
    bus.fail_reads("psu0", Some(STATUS_INPUT));

    psu.analyze(&mut sink).unwrap();

    let record = &sink.faults[0];
    assert_eq!(record.class, FaultClass::Input);
    assert_eq!(record.snapshot.len(), 6);
    assert!(record.snapshot.iter().all(|reading| reading.command != STATUS_INPUT));
}

#[test]
fn test_removal_cancels_debounce() {
    let bus = SimulatedBus::new();
    let mut psu = PowerSupply::new("psu0", INVENTORY_PATH, boxed(&bus, "psu0"), &settings());
    let mut sink = RecordingSink::new();
    let start = Instant::now();

    psu.presence_changed(true, start, &mut sink);
    psu.power_state_changed(true, start);
    assert!(psu.timer_deadline().is_some());

    psu.presence_changed(false, start + Duration::from_secs(1), &mut sink);
    assert_eq!(psu.timer_deadline(), None);

    psu.timer_expired(start + DEBOUNCE);
    assert!(!psu.powered_on());
    assert_eq!(psu.state(), PowerState::Absent);
    assert_eq!(sink.presence.last(), Some(&(INVENTORY_PATH.to_string(), false)));
}

#[test]
fn test_power_off_before_debounce() {
    let bus = SimulatedBus::new();
    let mut psu = PowerSupply::new("psu0", INVENTORY_PATH, boxed(&bus, "psu0"), &settings());
    let mut sink = RecordingSink::new();
    let start = Instant::now();

    psu.presence_changed(true, start, &mut sink);
    psu.power_state_changed(true, start);
    psu.power_state_changed(false, start + Duration::from_secs(2));
    psu.timer_expired(start + Duration::from_secs(10));

    assert!(!psu.powered_on());
    assert_eq!(psu.state(), PowerState::PresentPowerOffDebounce);
}

#[test]
fn test_insertion_while_powered_on() {
    let bus = SimulatedBus::new();
    let mut psu = PowerSupply::new("psu0", INVENTORY_PATH, boxed(&bus, "psu0"), &settings());
    let mut sink = RecordingSink::new();
    let start = Instant::now();

    psu.power_state_changed(true, start);
    assert_eq!(psu.timer_deadline(), None);

    let inserted = start + Duration::from_secs(30);
    psu.presence_changed(true, inserted, &mut sink);
    psu.timer_expired(inserted + DEBOUNCE);
    assert_eq!(psu.state(), PowerState::PresentPoweredOn);
}

#[test]
fn test_on_off_config_write_failure_is_tolerated() {
    let bus = SimulatedBus::new();
    bus.fail_writes("psu0", Some(ON_OFF_CONFIG));
    let mut psu = PowerSupply::new("psu0", INVENTORY_PATH, boxed(&bus, "psu0"), &settings());
    let mut sink = RecordingSink::new();

    psu.presence_changed(true, Instant::now(), &mut sink);

    assert!(psu.present());
    assert!(bus.writes().is_empty());
}
