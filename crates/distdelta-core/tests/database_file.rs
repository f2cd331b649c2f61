use std::fs;

use distdelta_core::db::format;
use distdelta_core::{DeltaDatabase, DeltaError};

mod common;

use common::fake_record;

#[test]
fn missing_file_is_an_empty_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = DeltaDatabase::load(dir.path().join("nope.db")).unwrap();
    assert!(db.is_empty());
    assert!(db.lookup_by_delta("a-b.switching").is_none());
}

#[test]
fn file_layout_is_five_lines_per_record_joined_by_separator() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deltas.db");
    let mut db = DeltaDatabase::load(&path).unwrap();

    let r1 = fake_record("foo-1.0.tar.gz", "foo-1.1.tar.gz", "switching", 1);
    let r2 = fake_record("foo-1.1.tar.gz", "foo-1.2.tar.gz", "switching", 7);
    db.upsert(r1.clone()).unwrap();
    db.upsert(r2.clone()).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(text, format!("{r1}\n--\n{r2}"));
    assert!(!text.ends_with('\n'));

    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 11);
    assert_eq!(lines[0], "foo-1.0.tar.gz-foo-1.1.tar.gz.switching");
    assert_eq!(lines[1], "foo-1.0.tar.gz\tfoo-1.1.tar.gz");
    assert!(lines[2].starts_with("MD5 "));
    assert_eq!(lines[5], "--");
}

#[test]
fn reload_preserves_order_and_contents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deltas.db");
    let mut db = DeltaDatabase::load(&path).unwrap();
    let records = [
        fake_record("b-1.tar", "b-2.tar", "switching", 10),
        fake_record("a-1.tar", "a-2.tar", "switching", 20),
        fake_record("c-1.tar", "a-2.tar", "switching", 30),
    ];
    for r in &records {
        db.upsert(r.clone()).unwrap();
    }

    let again = DeltaDatabase::load(&path).unwrap();
    assert_eq!(again.records(), &records[..]);

    let producers: Vec<&str> = again
        .lookup_by_destination("a-2.tar")
        .iter()
        .map(|r| r.source().name())
        .collect();
    assert_eq!(producers, ["a-1.tar", "c-1.tar"]);
}

#[test]
fn upsert_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deltas.db");
    let mut db = DeltaDatabase::load(&path).unwrap();
    let r = fake_record("x-1.tar.xz", "x-2.tar.xz", "switching", 5);

    db.upsert(r.clone()).unwrap();
    let first = fs::read_to_string(&path).unwrap();
    db.upsert(r.clone()).unwrap();
    let second = fs::read_to_string(&path).unwrap();

    assert_eq!(db.len(), 1);
    assert_eq!(first, second);
}

#[test]
fn upsert_replaces_by_delta_name_and_moves_to_the_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deltas.db");
    let mut db = DeltaDatabase::load(&path).unwrap();

    let old = fake_record("x-1.tar", "x-2.tar", "switching", 1);
    let other = fake_record("y-1.tar", "y-2.tar", "switching", 50);
    let newer = fake_record("x-1.tar", "x-2.tar", "switching", 100);
    assert_eq!(old.delta_name(), newer.delta_name());

    db.upsert(old).unwrap();
    db.upsert(other.clone()).unwrap();
    db.upsert(newer.clone()).unwrap();

    let again = DeltaDatabase::load(&path).unwrap();
    assert_eq!(again.records(), &[other, newer.clone()][..]);
    assert_eq!(again.lookup_by_delta(newer.delta_name()), Some(&newer));
}

#[test]
fn encode_decode_preserves_records() {
    let records = vec![
        fake_record("p-1.tbz2", "p-2.tbz2", "switching", 3),
        fake_record("q-1.tar.lzma", "q-2.tar.lzma", "switching", 9),
    ];
    let decoded = format::decode(&format::encode(&records)).unwrap();
    assert_eq!(decoded, records);
    assert!(format::decode("  \n").unwrap().is_empty());
}

#[test]
fn tolerates_crlf_and_a_trailing_newline() {
    let r = fake_record("a-1.tar", "a-2.tar", "switching", 4);
    let text = format!("{r}\n").replace('\n', "\r\n");
    assert_eq!(format::decode(&text).unwrap(), vec![r]);
}

#[test]
fn short_record_fails_the_whole_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deltas.db");
    let good = fake_record("a-1.tar", "a-2.tar", "switching", 4);
    let broken = "a-2.tar-a-3.tar.switching\na-2.tar\ta-3.tar\nMD5 00 UMD5 00";
    fs::write(&path, format!("{good}\n--\n{broken}")).unwrap();

    match DeltaDatabase::load(&path) {
        Err(DeltaError::MalformedRecord { index, .. }) => assert_eq!(index, 2),
        other => panic!("expected MalformedRecord, got {other:?}"),
    }
}

#[test]
fn bad_checksum_line_is_reported_against_its_record() {
    let r = fake_record("a-1.tar", "a-2.tar", "switching", 4).to_string();
    let mut lines: Vec<String> = r.lines().map(str::to_string).collect();
    lines[3] = lines[3].replacen("SHA1", "CRC32", 1);
    let text = lines.join("\n");

    assert!(matches!(
        format::decode(&text),
        Err(DeltaError::MalformedRecord { index: 1, .. })
    ));
}
