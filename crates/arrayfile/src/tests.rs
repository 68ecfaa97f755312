use super::*;
use config::ElementWidth;
use memarray::MemoryArray;
use tempfile::tempdir;

#[test]
fn create_zero_fills_body() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexes.dat");

    let mut f = ArrayFile::create(&path, 4, ElementWidth::Long).unwrap();
    assert_eq!(f.length(), 4);
    assert_eq!(f.lwm_scn(), 0);
    assert_eq!(f.hwm_scn(), 0);

    let mut mem = MemoryArray::new(4); // one segment covers 4 elements
    mem.expand_capacity(3);
    f.load(&mut mem).unwrap();
    for i in 0..4 {
        assert_eq!(mem.get(i), 0);
    }
}

#[test]
fn put_and_reopen_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexes.dat");

    {
        let mut f = ArrayFile::create(&path, 16, ElementWidth::Long).unwrap();
        f.put(0, 100).unwrap();
        f.put(5, 500).unwrap();
        f.flush().unwrap();
        f.write_water_marks(2, 2).unwrap();
    }

    let mut f = ArrayFile::open(&path).unwrap();
    assert_eq!(f.length(), 16);
    assert_eq!(f.lwm_scn(), 2);
    assert_eq!(f.hwm_scn(), 2);

    let mut mem = MemoryArray::new(4);
    mem.expand_capacity(15);
    f.load(&mut mem).unwrap();
    assert_eq!(mem.get(0), 100);
    assert_eq!(mem.get(5), 500);
    assert_eq!(mem.get(1), 0);
}

#[test]
fn put_bulk_last_write_wins_per_index() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexes.dat");
    let mut f = ArrayFile::create(&path, 4, ElementWidth::Long).unwrap();

    f.put_bulk(&[(0, 1), (0, 2), (0, 3)]).unwrap();

    let mut mem = MemoryArray::new(4);
    mem.expand_capacity(3);
    f.load(&mut mem).unwrap();
    assert_eq!(mem.get(0), 3);
}

#[test]
fn set_array_length_grows_and_zero_fills_tail() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexes.dat");
    let mut f = ArrayFile::create(&path, 4, ElementWidth::Long).unwrap();
    f.put(0, 9).unwrap();

    f.set_array_length(8).unwrap();
    assert_eq!(f.length(), 8);

    let mut mem = MemoryArray::new(4);
    mem.expand_capacity(7);
    f.load(&mut mem).unwrap();
    assert_eq!(mem.get(0), 9);
    for i in 4..8 {
        assert_eq!(mem.get(i), 0);
    }
}

#[test]
fn set_array_length_is_durable_without_explicit_flush() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexes.dat");
    {
        let mut f = ArrayFile::create(&path, 4, ElementWidth::Long).unwrap();
        f.set_array_length(16).unwrap();
    }
    let f = ArrayFile::open(&path).unwrap();
    assert_eq!(f.length(), 16);
}

#[test]
fn int_width_truncates_values() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexes.dat");
    let mut f = ArrayFile::create(&path, 2, ElementWidth::Int).unwrap();
    f.put(0, i64::from(i32::MAX) + 100).unwrap();

    let mut mem = MemoryArray::new(4);
    mem.expand_capacity(1);
    f.load(&mut mem).unwrap();
    assert_eq!(mem.get(0), i64::from((i32::MAX as i64 + 100) as i32));
}

#[test]
fn open_rejects_bad_magic() {
    use std::io::Write as _;
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexes.dat");
    {
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&[0u8; 40]).unwrap();
    }
    let err = ArrayFile::open(&path).unwrap_err();
    assert!(matches!(err, ArrayFileError::CorruptHeader(_)));
}

#[test]
fn reset_zeroes_body_and_water_marks_but_keeps_length() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("indexes.dat");

    {
        let mut f = ArrayFile::create(&path, 8, ElementWidth::Long).unwrap();
        f.put(0, 42).unwrap();
        f.put(5, 500).unwrap();
        f.flush().unwrap();
        f.write_water_marks(2, 2).unwrap();

        f.reset().unwrap();
        assert_eq!(f.length(), 8);
        assert_eq!(f.lwm_scn(), 0);
        assert_eq!(f.hwm_scn(), 0);
    }

    // A stale element read after reopen would fail this: reset() must have
    // zeroed the body on disk, not just the in-memory header copy.
    let mut f = ArrayFile::open(&path).unwrap();
    assert_eq!(f.lwm_scn(), 0);
    assert_eq!(f.hwm_scn(), 0);
    let mut mem = MemoryArray::new(4);
    mem.expand_capacity(7);
    f.load(&mut mem).unwrap();
    for i in 0..8 {
        assert_eq!(mem.get(i), 0, "index {i} should read zero after reset");
    }
}
