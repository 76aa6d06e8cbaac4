use trowel_types::Timestamp;

#[test]
fn now_is_after_epoch() {
    let ts = Timestamp::now();
    // 2020-01-01 in milliseconds; any sane clock is past this.
    assert!(ts.as_millis() > 1_577_836_800_000);
}

#[test]
fn from_millis_roundtrip() {
    let ts = Timestamp::from_millis(42);
    assert_eq!(ts.as_millis(), 42);
}

#[test]
fn ordering_follows_millis() {
    let early = Timestamp::from_millis(100);
    let late = Timestamp::from_millis(200);
    assert!(early < late);
    assert_eq!(early.millis_until(late), 100);
}

#[test]
fn millis_until_saturates() {
    let early = Timestamp::from_millis(100);
    let late = Timestamp::from_millis(200);
    assert_eq!(late.millis_until(early), 0);
}

#[test]
fn serde_is_transparent() {
    let ts = Timestamp::from_millis(1234);
    let json = serde_json::to_string(&ts).unwrap();
    assert_eq!(json, "1234");

    let back: Timestamp = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ts);
}
