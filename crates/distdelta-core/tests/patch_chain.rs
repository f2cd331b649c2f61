use std::collections::HashSet;
use std::fs;
use std::path::Path;

use distdelta_core::patch::{chain_format, find_chain, patch_format, ChainSource, ReconstructRequest};
use distdelta_core::tool::ToolRunner;
use distdelta_core::{
    DeltaDatabase, DeltaError, DeltaRecord, FileIdentity, Form, PatchChainResolver, ReconstructOutcome,
};

mod common;

use common::{fake_record, FakeTool};

fn db_with(dir: &Path, records: &[DeltaRecord]) -> DeltaDatabase {
    let mut db = DeltaDatabase::load(dir.join("deltas.db")).unwrap();
    for r in records {
        db.upsert(r.clone()).unwrap();
    }
    db
}

fn have(names: &[&str]) -> HashSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn hops(chain: &[DeltaRecord]) -> Vec<(&str, &str)> {
    chain
        .iter()
        .map(|r| (r.source().name(), r.destination().name()))
        .collect()
}

#[test]
fn two_hop_chain_from_the_oldest_local_archive() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_with(
        dir.path(),
        &[
            fake_record("A.tar", "B.tar", "switching", 1),
            fake_record("B.tar", "C.tar", "switching", 10),
        ],
    );

    let chain = find_chain(&db, "C.tar", &have(&["A.tar"])).unwrap();
    assert_eq!(hops(&chain), [("A.tar", "B.tar"), ("B.tar", "C.tar")]);

    let chain = find_chain(&db, "C.tar", &have(&["A.tar", "B.tar"])).unwrap();
    assert_eq!(hops(&chain), [("B.tar", "C.tar")]);

    assert!(find_chain(&db, "C.tar", &have(&["Z.tar"])).is_none());
    assert!(find_chain(&db, "Q.tar", &have(&["A.tar"])).is_none());
}

#[test]
fn shortest_chain_wins() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_with(
        dir.path(),
        &[
            fake_record("A.tar", "B.tar", "switching", 1),
            fake_record("B.tar", "C.tar", "switching", 10),
            fake_record("A.tar", "C.tar", "switching", 20),
        ],
    );
    let chain = find_chain(&db, "C.tar", &have(&["A.tar"])).unwrap();
    assert_eq!(hops(&chain), [("A.tar", "C.tar")]);
}

#[test]
fn cycles_terminate() {
    let dir = tempfile::tempdir().unwrap();
    let db = db_with(
        dir.path(),
        &[
            fake_record("A.tar", "B.tar", "switching", 1),
            fake_record("B.tar", "A.tar", "switching", 10),
        ],
    );
    assert!(find_chain(&db, "B.tar", &have(&["C.tar"])).is_none());
}

#[test]
fn format_tag_ignores_delta_compression() {
    assert_eq!(patch_format("a.tar-b.tar.switching.xz").as_deref(), Some("switching"));
    assert_eq!(patch_format("a.tar-b.tar.bdelta").as_deref(), Some("bdelta"));
    assert_eq!(patch_format("nodot"), None);

    let mixed = [
        fake_record("A.tar", "B.tar", "switching", 1),
        fake_record("B.tar", "C.tar", "bdelta", 10),
    ];
    assert!(matches!(
        chain_format(&mixed),
        Err(DeltaError::InconsistentPatchFormat(_))
    ));
}

fn request(dir: &Path, source: &Path) -> ReconstructRequest {
    ReconstructRequest {
        source: ChainSource {
            path: source.to_path_buf(),
            form: Form::Stored,
        },
        delta_dir: dir.join("deltas"),
        output_dir: dir.join("out"),
        compress: true,
    }
}

#[test]
fn mixed_formats_never_reach_the_patcher() {
    let dir = tempfile::tempdir().unwrap();
    let src = common::write(dir.path(), "A.tar", b"whatever");
    let chain = [
        fake_record("A.tar", "B.tar", "switching", 1),
        fake_record("B.tar", "C.tar", "bdelta", 10),
    ];

    let tool = FakeTool::default();
    let resolver = PatchChainResolver::new(&tool, ToolRunner::default());
    let err = resolver.reconstruct(&chain, &request(dir.path(), &src)).unwrap_err();

    assert!(matches!(err, DeltaError::InconsistentPatchFormat(_)));
    assert_eq!(tool.patch_calls(), 0);
    assert!(!dir.path().join("out").exists());
}

#[test]
fn discontinuous_chain_is_broken() {
    let dir = tempfile::tempdir().unwrap();
    let src = common::write(dir.path(), "A.tar", b"whatever");
    let chain = [
        fake_record("A.tar", "B.tar", "switching", 1),
        fake_record("X.tar", "C.tar", "switching", 10),
    ];

    let tool = FakeTool::default();
    let resolver = PatchChainResolver::new(&tool, ToolRunner::default());
    let err = resolver.reconstruct(&chain, &request(dir.path(), &src)).unwrap_err();
    assert!(matches!(err, DeltaError::BrokenChain(_)));
    assert_eq!(tool.patch_calls(), 0);
}

/// Builds a one-hop chain on disk: `A.tar` plus a fake delta to `dest_name`,
/// whose recorded stored bytes are `dest_stored`.
fn one_hop(dir: &Path, dest_name: &str, dest_plain: &[u8], dest_stored: &[u8]) -> (DeltaRecord, std::path::PathBuf) {
    let src_bytes = common::tar_bytes("A");
    let src = common::write(dir, "A.tar", &src_bytes);

    let fixtures = dir.join("fixtures");
    fs::create_dir_all(&fixtures).unwrap();
    let stored = common::write(&fixtures, dest_name, dest_stored);
    let plain = common::write(&fixtures, "plain", dest_plain);

    let deltas = dir.join("deltas");
    fs::create_dir_all(&deltas).unwrap();
    let delta_name = format!("A.tar-{dest_name}.switching");
    let mut delta_bytes = b"FAKEDELTA\n".to_vec();
    delta_bytes.extend_from_slice(dest_plain);
    let delta = common::write(&deltas, &delta_name, &delta_bytes);

    let record = DeltaRecord::new(
        FileIdentity::compute("A.tar", &src, &src).unwrap(),
        FileIdentity::compute(dest_name, &stored, &plain).unwrap(),
        FileIdentity::compute(&delta_name, &delta, &delta).unwrap(),
    );
    (record, src)
}

#[test]
fn reconstructs_byte_identical_archive() {
    let dir = tempfile::tempdir().unwrap();
    let plain = common::tar_bytes("B");
    let packed = common::zst_canonical(&plain);
    let (record, src) = one_hop(dir.path(), "B.tar.zst", &plain, &packed);

    let tool = FakeTool::default();
    let resolver = PatchChainResolver::new(&tool, ToolRunner::default());
    let out = resolver.reconstruct(&[record], &request(dir.path(), &src)).unwrap();

    let expect = dir.path().join("out").join("B.tar.zst");
    assert_eq!(out, ReconstructOutcome::Reconstructed(expect.clone()));
    assert_eq!(fs::read(&expect).unwrap(), packed);
    assert_eq!(tool.patch_calls(), 1);

    let leftovers: Vec<_> = fs::read_dir(dir.path().join("out"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("B.tar.zst")]);
}

#[test]
fn uncompressed_request_skips_recompression() {
    let dir = tempfile::tempdir().unwrap();
    let plain = common::tar_bytes("B");
    let packed = common::zst_two_frames(&plain);
    let (record, src) = one_hop(dir.path(), "B.tar.zst", &plain, &packed);

    let tool = FakeTool::default();
    let resolver = PatchChainResolver::new(&tool, ToolRunner::default());
    let mut req = request(dir.path(), &src);
    req.compress = false;
    let out = resolver.reconstruct(&[record], &req).unwrap();

    let expect = dir.path().join("out").join("B.tar");
    assert_eq!(out, ReconstructOutcome::Reconstructed(expect.clone()));
    assert_eq!(fs::read(&expect).unwrap(), plain);
}

#[test]
fn recompression_mismatch_is_quarantined() {
    let dir = tempfile::tempdir().unwrap();
    let plain = common::tar_bytes("B");
    let packed = common::zst_two_frames(&plain);
    let (record, src) = one_hop(dir.path(), "B.tar.zst", &plain, &packed);

    let tool = FakeTool::default();
    let resolver = PatchChainResolver::new(&tool, ToolRunner::default());
    let out = resolver.reconstruct(&[record], &request(dir.path(), &src)).unwrap();

    let expect = dir
        .path()
        .join("out")
        .join("delta-reconstructed")
        .join("B.tar.zst");
    assert_eq!(out, ReconstructOutcome::Quarantined(expect.clone()));
    assert!(!dir.path().join("out").join("B.tar.zst").exists());

    let mut rebuilt = Vec::new();
    zstd::stream::copy_decode(fs::File::open(&expect).unwrap(), &mut rebuilt).unwrap();
    assert_eq!(rebuilt, plain);
}

#[test]
fn wrong_content_is_rejected_and_not_published() {
    let dir = tempfile::tempdir().unwrap();
    let plain = common::tar_bytes("B");
    let packed = common::zst_canonical(&plain);
    let (record, src) = one_hop(dir.path(), "B.tar.zst", &plain, &packed);

    let tool = FakeTool::corrupting();
    let resolver = PatchChainResolver::new(&tool, ToolRunner::default());
    let err = resolver.reconstruct(&[record], &request(dir.path(), &src)).unwrap_err();

    assert!(matches!(err, DeltaError::ReconstructionChecksumMismatch(_)));
    let entries = fs::read_dir(dir.path().join("out")).unwrap().count();
    assert_eq!(entries, 0);
}

#[test]
fn tampered_source_or_missing_delta_fail_before_patching() {
    let dir = tempfile::tempdir().unwrap();
    let plain = common::tar_bytes("B");
    let packed = common::zst_canonical(&plain);
    let (record, src) = one_hop(dir.path(), "B.tar.zst", &plain, &packed);
    let tool = FakeTool::default();
    let resolver = PatchChainResolver::new(&tool, ToolRunner::default());

    fs::remove_file(dir.path().join("deltas").join(record.delta_name())).unwrap();
    let err = resolver
        .reconstruct(std::slice::from_ref(&record), &request(dir.path(), &src))
        .unwrap_err();
    assert!(matches!(err, DeltaError::BrokenChain(_)));

    fs::write(&src, b"tampered").unwrap();
    let err = resolver.reconstruct(&[record], &request(dir.path(), &src)).unwrap_err();
    assert!(matches!(err, DeltaError::ChecksumMismatch { role: "source", .. }));
    assert_eq!(tool.patch_calls(), 0);
}
