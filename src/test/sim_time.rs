use crate::sim::{ParseQuantityError, SimTime};

#[test]
fn sim_time_unit_conversions() {
    assert_eq!(SimTime::from_micros(1), SimTime(1_000));
    assert_eq!(SimTime::from_millis(1), SimTime(1_000_000));
    assert_eq!(SimTime::from_secs(1), SimTime(1_000_000_000));
}

#[test]
fn sim_time_unit_conversions_saturate_on_overflow() {
    assert_eq!(SimTime::from_micros(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_millis(u64::MAX), SimTime(u64::MAX));
    assert_eq!(SimTime::from_secs(u64::MAX), SimTime(u64::MAX));
}

#[test]
fn sim_time_parses_units() {
    assert_eq!("2ms".parse::<SimTime>(), Ok(SimTime::from_millis(2)));
    assert_eq!("1us".parse::<SimTime>(), Ok(SimTime::from_micros(1)));
    assert_eq!("1.5s".parse::<SimTime>(), Ok(SimTime(1_500_000_000)));
    assert_eq!("5".parse::<SimTime>(), Ok(SimTime::from_secs(5)));
    assert_eq!("250 ns".parse::<SimTime>(), Ok(SimTime(250)));
}

#[test]
fn sim_time_parses_exponent_notation() {
    assert_eq!("1e-3s".parse::<SimTime>(), Ok(SimTime::from_millis(1)));
    assert_eq!("2.5E3us".parse::<SimTime>(), Ok(SimTime::from_micros(2_500)));
    assert_eq!("1e+2ms".parse::<SimTime>(), Ok(SimTime::from_millis(100)));
    assert_eq!("5e0".parse::<SimTime>(), Ok(SimTime::from_secs(5)));
    assert!(matches!("1ex".parse::<SimTime>(), Err(ParseQuantityError::Unit { .. })));
}

#[test]
fn sim_time_rejects_bad_input() {
    assert_eq!("".parse::<SimTime>(), Err(ParseQuantityError::Empty));
    assert!(matches!("2 fortnights".parse::<SimTime>(), Err(ParseQuantityError::Unit { .. })));
    assert!(matches!("ms".parse::<SimTime>(), Err(ParseQuantityError::Number(_))));
    assert!(matches!("-1s".parse::<SimTime>(), Err(_)));
}

#[test]
fn sim_time_display_picks_the_coarsest_exact_unit() {
    assert_eq!(SimTime::from_secs(5).to_string(), "5s");
    assert_eq!(SimTime::from_millis(2).to_string(), "2ms");
    assert_eq!(SimTime(116_800).to_string(), "116800ns");
    assert_eq!(SimTime(1_000_000_001).to_string(), "1.000000001s");
}

#[test]
fn sim_time_serde_uses_strings() {
    let t: SimTime = serde_json::from_str("\"2ms\"").expect("parse");
    assert_eq!(t, SimTime::from_millis(2));
    assert_eq!(serde_json::to_string(&t).expect("serialize"), "\"2ms\"");
}
