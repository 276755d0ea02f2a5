use formula_arena::{Arena, ArenaConfig, ArenaError, MappedArena};
use pretty_assertions::assert_eq;
use tempfile::tempdir;

#[test]
fn create_write_and_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dataset.arena");

    let (root, payload) = {
        let mut arena = MappedArena::create(&path, &ArenaConfig::small()).unwrap();
        let payload = arena.allocate(16);
        arena.bytes_mut(payload, 5).copy_from_slice(b"hello");
        let root = arena.allocate(8);
        arena.write_offset(root, payload);
        arena.set_root(root);
        arena.flush().unwrap();
        (root, payload)
    };

    let arena = MappedArena::open(&path).unwrap();
    assert_eq!(arena.root(), root);
    assert_eq!(arena.read_offset(root), payload);
    assert_eq!(arena.bytes(payload, 5), b"hello");
}

#[test]
fn growth_remaps_and_keeps_data() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("grow.arena");
    let config = ArenaConfig::small().with_initial_capacity(256);

    let mut arena = MappedArena::create(&path, &config).unwrap();
    let first = arena.allocate(8);
    arena.write_u64(first, 99);

    for _ in 0..64 {
        arena.allocate(1024);
    }

    assert!(arena.capacity() >= 64 * 1024);
    assert_eq!(arena.read_u64(first), 99);
    assert_eq!(
        std::fs::metadata(&path).unwrap().len(),
        arena.capacity() as u64
    );
}

#[test]
fn reader_refresh_sees_writer_growth() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.arena");
    let config = ArenaConfig::small().with_initial_capacity(256);

    let mut writer = MappedArena::create(&path, &config).unwrap();
    let mut reader = MappedArena::open(&path).unwrap();

    let at = writer.allocate(4096);
    writer.write_u32(at, 7);
    writer.flush().unwrap();

    assert!(reader.refresh().unwrap());
    assert_eq!(reader.read_u32(at), 7);
    assert!(!reader.refresh().unwrap());
}

#[test]
fn open_rejects_foreign_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("not-an-arena");
    std::fs::write(&path, vec![0x55u8; 512]).unwrap();

    let err = MappedArena::open(&path).unwrap_err();
    assert!(matches!(err, ArenaError::BadMagic { .. }), "{err}");
}

#[test]
fn open_missing_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing.arena");

    let err = MappedArena::open(&path).unwrap_err();
    match err {
        ArenaError::Io { path: reported, .. } => assert_eq!(reported, path),
        other => panic!("unexpected error: {other}"),
    }
}
