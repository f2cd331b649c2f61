use distdelta_core::{Algorithm, ChecksumSet, ChecksumValue, DeltaError, FileIdentity, Form};

mod common;

#[test]
fn known_digests_of_abc() {
    let dir = tempfile::tempdir().unwrap();
    let p = common::write(dir.path(), "abc.txt", b"abc");
    let sums = ChecksumSet::compute(&p).unwrap();

    assert_eq!(sums.get(Algorithm::Md5).to_text(), "900150983cd24fb0d6963f7d28e17f72");
    assert_eq!(
        sums.get(Algorithm::Sha1).to_text(),
        "a9993e364706816aba3e25717850c26c9cd0d89d"
    );
    assert_eq!(
        sums.get(Algorithm::Sha256).to_text(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(
        sums.get(Algorithm::Rmd160).to_text(),
        "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
    );
    assert_eq!(sums.size(), 3);
}

#[test]
fn identical_files_compare_equal_and_edits_do_not() {
    let dir = tempfile::tempdir().unwrap();
    let a = common::write(dir.path(), "a", &common::tar_bytes("x"));
    let b = common::write(dir.path(), "b", &common::tar_bytes("x"));
    let c = common::write(dir.path(), "c", &common::tar_bytes("y"));

    let sa = ChecksumSet::compute(&a).unwrap();
    let sb = ChecksumSet::compute(&b).unwrap();
    let sc = ChecksumSet::compute(&c).unwrap();

    assert!(sa.try_eq(&sb).unwrap());
    assert!(!sa.try_eq(&sc).unwrap());
}

#[test]
fn foreign_operands_are_invalid_comparisons() {
    let set = common::fake_sums(1, 10);
    let err = set.try_eq(&"MD5 00").unwrap_err();
    assert!(matches!(err, DeltaError::InvalidComparison(_)));

    let md5 = set.get(Algorithm::Md5).clone();
    let sha1 = set.get(Algorithm::Sha1).clone();
    assert!(matches!(md5.try_eq(&sha1), Err(DeltaError::InvalidComparison(_))));
    assert!(matches!(md5.try_eq(&42u32), Err(DeltaError::InvalidComparison(_))));

    let id = common::fake_identity("foo-1.0.tar.gz", 3);
    assert!(matches!(id.try_eq(&set), Err(DeltaError::InvalidComparison(_))));
}

#[test]
fn values_compare_numerically_across_renderings() {
    let padded = ChecksumValue::from_text(Algorithm::Md5, "000000000000000000000000000000ab").unwrap();
    let short = ChecksumValue::from_text(Algorithm::Md5, "ab").unwrap();
    assert!(padded.try_eq(&short).unwrap());
    assert_eq!(short.to_text(), "000000000000000000000000000000ab");

    let size = ChecksumValue::from_size(4096);
    assert!(size.try_eq(&ChecksumValue::from_text(Algorithm::Size, "4096").unwrap()).unwrap());
}

#[test]
fn incomplete_sets_are_malformed() {
    let missing = ChecksumSet::from_values([("md5", "00"), ("sha1", "00")]);
    assert!(matches!(missing, Err(DeltaError::MalformedChecksum(_))));

    let unknown = ChecksumSet::from_values([("crc32", "00")]);
    assert!(matches!(unknown, Err(DeltaError::MalformedChecksum(_))));
}

#[test]
fn identity_keeps_basename_and_both_forms() {
    let id = FileIdentity::new(
        "/var/cache/distfiles/foo-1.0.tar.gz",
        common::fake_sums(1, 100),
        common::fake_sums(2, 400),
    )
    .unwrap();
    assert_eq!(id.name(), "foo-1.0.tar.gz");
    assert_eq!(id.checksums(Form::Stored).size(), 100);
    assert_eq!(id.checksums(Form::Uncompressed).size(), 400);

    let line = id.checksum_line();
    assert!(line.starts_with("MD5 01010101010101010101010101010101 UMD5 02020202"));
    assert!(line.ends_with("SIZE 100 USIZE 400"));
}

#[test]
fn matches_file_checks_the_requested_form() {
    let dir = tempfile::tempdir().unwrap();
    let raw = common::tar_bytes("v1");
    let packed = common::zst_canonical(&raw);
    let stored = common::write(dir.path(), "foo-1.0.tar.zst", &packed);
    let plain = common::write(dir.path(), "foo-1.0.tar", &raw);

    let id = FileIdentity::compute("foo-1.0.tar.zst", &stored, &plain).unwrap();
    assert!(id.matches_file(&stored, Form::Stored).unwrap());
    assert!(id.matches_file(&plain, Form::Uncompressed).unwrap());
    assert!(!id.matches_file(&plain, Form::Stored).unwrap());
}
