use super::*;
use std::sync::{Arc, Mutex};

#[test]
fn fresh_array_has_zero_length() {
    let m = MemoryArray::new(4);
    assert_eq!(m.length(), 0);
}

#[test]
fn unwritten_cells_read_zero() {
    let mut m = MemoryArray::new(4);
    m.expand_capacity(10);
    assert_eq!(m.get(0), 0);
    assert_eq!(m.get(10), 0);
    assert_eq!(m.get(15), 0);
}

#[test]
fn set_then_get_round_trips() {
    let mut m = MemoryArray::new(4);
    m.expand_capacity(20);
    m.set(0, 100);
    m.set(5, 500);
    m.set(20, -7);
    assert_eq!(m.get(0), 100);
    assert_eq!(m.get(5), 500);
    assert_eq!(m.get(20), -7);
}

#[test]
fn expand_capacity_grows_in_whole_segments() {
    let mut m = MemoryArray::new(4); // segment size 16
    m.expand_capacity(0);
    assert_eq!(m.length(), 16);
    m.expand_capacity(16);
    assert_eq!(m.length(), 32);
    // still within existing segments: no further growth
    m.expand_capacity(17);
    assert_eq!(m.length(), 32);
}

#[test]
fn expand_capacity_is_monotonic() {
    let mut m = MemoryArray::new(4);
    m.expand_capacity(100);
    let len_after_first = m.length();
    m.expand_capacity(5); // smaller index, should not shrink
    assert_eq!(m.length(), len_after_first);
}

#[test]
fn large_index_expands_to_matching_segment_count() {
    let mut m = MemoryArray::new(16); // segment size 65536
    m.set_listener(|_| {});
    m.expand_capacity(100_000);
    assert_eq!(m.length(), 131_072);
    m.set(100_000, 42);
    assert_eq!(m.get(100_000), 42);
    assert_eq!(m.get(50_000), 0);
}

#[test]
fn clear_zeroes_cells_but_keeps_length() {
    let mut m = MemoryArray::new(4);
    m.expand_capacity(20);
    m.set(0, 1);
    m.set(20, 2);
    let len_before = m.length();
    m.clear();
    assert_eq!(m.length(), len_before);
    assert_eq!(m.get(0), 0);
    assert_eq!(m.get(20), 0);
}

#[test]
fn growth_listener_fires_with_new_length() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = Arc::clone(&seen);

    let mut m = MemoryArray::new(4);
    m.set_listener(move |len| seen_clone.lock().unwrap().push(len));

    m.expand_capacity(0);
    m.expand_capacity(16);
    m.expand_capacity(10); // no growth, listener should not fire again

    assert_eq!(*seen.lock().unwrap(), vec![16, 32]);
}

#[test]
fn segments_are_stable_across_growth() {
    // A segment obtained before growth must still report the same values
    // after more segments are appended — addresses of existing segments
    // never change.
    let mut m = MemoryArray::new(4);
    m.expand_capacity(0);
    m.set(3, 77);
    let before = m.get(3);
    m.expand_capacity(1000);
    assert_eq!(m.get(3), before);
}
