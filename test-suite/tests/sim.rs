//! Runs the whole suite against the simulated bus


use std::num::NonZeroUsize;

use rand::{
    SeedableRng as _,
    rngs::StdRng,
};

use i2c_test_suite::{
    SuiteConfig,
    Verdict,
    case::CaseState,
    config::DeviceConfig,
    device::{
        AddressWindow,
        Bus as _,
        ByteStore as _,
        hal::HalBus,
        sim::SimBus,
    },
    logging,
    payload::Payload,
    registry,
    report::{
        GreenteaReporter,
        Recorder,
    },
    scheduler::RunState,
    verify::{
        verify_range_roundtrip,
        verify_single_byte,
    },
};


fn bus() -> HalBus<SimBus> {
    let devices = DeviceConfig::default();
    HalBus::new(SimBus::new(&devices), devices)
}

fn config() -> SuiteConfig {
    SuiteConfig {
        seed: Some(1234),
        .. SuiteConfig::default()
    }
}


#[test]
fn the_default_cases_pass() {
    logging::init_for_tests();

    let mut recorder = Recorder::default();
    let summary = registry::run(&config(), bus(), &mut recorder).unwrap();

    assert_eq!(summary.state, RunState::Complete);
    assert_eq!(summary.passed(), 4);
    assert_eq!(summary.verdict(), Verdict::Passed);
}

#[test]
fn a_faulty_eeprom_fails_the_eeprom_cases_but_every_case_runs() {
    logging::init_for_tests();

    let mut bus = bus();
    bus.i2c().eeprom_mut().unwrap().stick_bits(0x20);

    let mut recorder = Recorder::default();
    let summary = registry::run(&config(), bus, &mut recorder).unwrap();

    let states: Vec<_> = summary.cases.iter().map(|case| case.state).collect();
    assert_eq!(states, [
        CaseState::Passed,
        CaseState::Failed,
        CaseState::Failed,
        CaseState::Failed,
    ]);
    assert_eq!(summary.state, RunState::Complete);
    assert_eq!(summary.verdict(), Verdict::Failed);
    assert_eq!(summary.verdict().exit_code(), 1);
}

#[test]
fn a_write_cut_short_by_a_nack_is_reported_as_a_failure() {
    logging::init_for_tests();

    let mut bus = bus();
    // The 10-byte case fits, the 100-byte case doesn't.
    bus.i2c().eeprom_mut().unwrap().nack_writes_after(50);

    let mut recorder = Recorder::default();
    let summary = registry::run(&config(), bus, &mut recorder).unwrap();

    assert_eq!(summary.cases[1].state, CaseState::Passed);
    assert_eq!(summary.cases[2].state, CaseState::Failed);
    assert_eq!(summary.cases.len(), 4);
}

#[test]
fn a_read_cut_short_fails_with_a_count_mismatch() {
    logging::init_for_tests();

    let mut bus = bus();
    let mut rng = StdRng::seed_from_u64(0);
    bus.i2c().eeprom_mut().unwrap().fail_reads_after(64);

    let window  = AddressWindow::new(1, 100).unwrap();
    let outcome = verify_range_roundtrip(&mut bus.store(), &mut rng, window);

    assert!(!outcome.passed);
    assert!(outcome.message.unwrap().contains("count mismatch: wrote 100 bytes, read 64 bytes"));
}

#[test]
fn a_corrupted_byte_is_detected() {
    logging::init_for_tests();

    let mut bus = bus();
    let mut rng = StdRng::seed_from_u64(0);
    bus.i2c().eeprom_mut().unwrap().corrupt_reads_at(50, 0);

    let window  = AddressWindow::new(1, 100).unwrap();
    let outcome = verify_range_roundtrip(&mut bus.store(), &mut rng, window);

    assert!(!outcome.passed);
    let message = outcome.message.unwrap();
    assert!(message.contains("string mismatch"), "{}", message);
    assert!(message.contains("data mismatch at 0x0032"), "{}", message);
}

#[test]
fn repeated_round_trips_at_the_same_address_pass() {
    let mut bus = bus();
    let mut rng = StdRng::seed_from_u64(5);
    let window  = AddressWindow::new(1, 100).unwrap();

    for _ in 0 .. 5 {
        let outcome = verify_range_roundtrip(&mut bus.store(), &mut rng, window);
        assert!(outcome.passed, "{}", outcome);
    }
}

#[test]
fn a_single_byte_round_trip_passes_after_a_write_to_its_page() {
    let mut bus = bus();
    let mut rng = StdRng::seed_from_u64(9);

    let payload = Payload::generate(&mut rng, NonZeroUsize::new(32).unwrap());
    let written = bus.store().write(0, payload.as_bytes()).unwrap();
    assert_eq!(written, 32);

    let outcome = verify_single_byte(&mut bus.store(), &mut rng, 1);
    assert!(outcome.passed, "{}", outcome);
}

#[test]
fn the_greentea_report_lists_every_case() {
    let mut bus = bus();
    bus.i2c().remove_sensor();

    let mut reporter = GreenteaReporter::new(Vec::new());
    registry::run(&config(), bus, &mut reporter).unwrap();
    let report = String::from_utf8(reporter.into_inner()).unwrap();

    let lines: Vec<_> = report.lines()
        .filter(|line| line.starts_with("{{"))
        .collect();
    assert_eq!(lines, [
        "{{__timeout;40}}",
        "{{__host_test_name;default_auto}}",
        "{{__testcase_count;4}}",
        "{{__testcase_name;I2C - LM75B Temperature Read}}",
        "{{__testcase_name;I2C - EEPROM WR 10 Bytes}}",
        "{{__testcase_name;I2C - EEPROM WR 100 Bytes}}",
        "{{__testcase_name;I2C - EEPROM WR Single Byte}}",
        "{{__testcase_start;I2C - LM75B Temperature Read}}",
        "{{__testcase_finish;I2C - LM75B Temperature Read;0;1}}",
        "{{__testcase_start;I2C - EEPROM WR 10 Bytes}}",
        "{{__testcase_finish;I2C - EEPROM WR 10 Bytes;1;0}}",
        "{{__testcase_start;I2C - EEPROM WR 100 Bytes}}",
        "{{__testcase_finish;I2C - EEPROM WR 100 Bytes;1;0}}",
        "{{__testcase_start;I2C - EEPROM WR Single Byte}}",
        "{{__testcase_finish;I2C - EEPROM WR Single Byte;1;0}}",
        "{{__testcase_summary;3;1}}",
        "{{end;failure}}",
    ]);
    assert!(report.contains(">>> 'I2C - LM75B Temperature Read': "));
}
