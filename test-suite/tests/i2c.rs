//! Test Suite for the I2C bus on the test target
//!
//! This test suite communicates with hardware. It needs a test target running
//! the firmware, with the LM75B and the EEPROM attached, and a
//! `test-stand.toml` pointing to it. Run with `cargo test -- --ignored`.


use rand::{
    SeedableRng as _,
    rngs::StdRng,
};

use i2c_test_suite::{
    Result,
    TestStand,
    device::{
        AddressWindow,
        TemperatureSensor as _,
    },
    verify::{
        verify_range_roundtrip,
        verify_single_byte,
        verify_temperature,
    },
};


#[test]
#[ignore]
fn it_should_open_the_temperature_sensor() -> Result {
    let mut test_stand = TestStand::new()?;

    assert!(test_stand.target.is_open()?);

    Ok(())
}

#[test]
#[ignore]
fn it_should_read_a_plausible_temperature() -> Result {
    let mut test_stand = TestStand::new()?;

    let outcome = verify_temperature(&mut test_stand.target, 25.0, 20.0);
    assert!(outcome.passed, "{}", outcome);

    Ok(())
}

#[test]
#[ignore]
fn it_should_write_and_read_back_10_bytes() -> Result {
    let mut test_stand = TestStand::new()?;
    let mut rng        = StdRng::from_entropy();

    let window  = AddressWindow::new(1, 10).unwrap();
    let outcome = verify_range_roundtrip(&mut test_stand.target, &mut rng, window);
    assert!(outcome.passed, "{}", outcome);

    Ok(())
}

#[test]
#[ignore]
fn it_should_write_and_read_back_100_bytes() -> Result {
    let mut test_stand = TestStand::new()?;
    let mut rng        = StdRng::from_entropy();

    let window  = AddressWindow::new(1, 100).unwrap();
    let outcome = verify_range_roundtrip(&mut test_stand.target, &mut rng, window);
    assert!(outcome.passed, "{}", outcome);

    Ok(())
}

#[test]
#[ignore]
fn it_should_write_and_read_back_a_single_byte() -> Result {
    let mut test_stand = TestStand::new()?;
    let mut rng        = StdRng::from_entropy();

    let outcome = verify_single_byte(&mut test_stand.target, &mut rng, 1);
    assert!(outcome.passed, "{}", outcome);

    Ok(())
}
