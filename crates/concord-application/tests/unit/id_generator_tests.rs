//! Tests for short id generation

use std::collections::HashSet;
use std::sync::Arc;

use concord_application::use_cases::IdGenerator;
use concord_domain::error::Error;

fn generator() -> IdGenerator {
    IdGenerator::new("cn", "192.168.1.100", "8080")
        .expect("valid generator")
        .with_pid(0x1234)
}

#[test]
fn test_id_layout() {
    let id = generator().next();
    assert_eq!(id.len(), 32);
    assert_eq!(&id[0..3], "src");
    assert_eq!(&id[3..7], "0034");
    assert_eq!(&id[7..11], "0000");
    assert_eq!(&id[11..12], "@");
    assert_eq!(&id[12..14], "cn");
    assert!(id[14..25].chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(&id[25..29], "0164");
    assert_eq!(&id[29..31], "80");
    assert!(id.ends_with('2'));
}

#[test]
fn test_sub_is_truncated_and_right_aligned() {
    let generator = generator();
    assert_eq!(&generator.next_with_sub("orders")[0..3], "ord");
    assert_eq!(&generator.next_with_sub("x")[0..3], "  x");
    assert_eq!(&generator.next_with_sub("")[0..3], "src");
}

#[test]
fn test_counter_advances_per_id() {
    let generator = generator();
    let first = generator.next();
    let second = generator.next();
    assert_eq!(&first[7..11], "0000");
    assert_eq!(&second[7..11], "0001");
    assert_ne!(first, second);
}

#[test]
fn test_invalid_host_or_port_rejected() {
    assert!(matches!(
        IdGenerator::new("cn", "::1", "8080"),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        IdGenerator::new("cn", "not-an-ip", "8080"),
        Err(Error::InvalidArgument { .. })
    ));
    assert!(matches!(
        IdGenerator::new("cn", "10.0.0.1", "80"),
        Err(Error::InvalidArgument { .. })
    ));
}

/// 4 threads x 25 000 ids, all distinct
#[test]
fn test_concurrent_ids_are_unique() {
    let generator = Arc::new(generator());
    let threads: Vec<_> = (0..4)
        .map(|_| {
            let generator = Arc::clone(&generator);
            std::thread::spawn(move || (0..25_000).map(|_| generator.next()).collect::<Vec<_>>())
        })
        .collect();

    let mut seen = HashSet::new();
    for thread in threads {
        for id in thread.join().unwrap() {
            assert!(seen.insert(id), "duplicate id generated");
        }
    }
    assert_eq!(seen.len(), 100_000);
}
