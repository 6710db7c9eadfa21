use qiniu_publish_core::etag::{etag, hash_files, BLOCK_SIZE};
use qiniu_publish_core::run::{FileRecord, PublishRun};
use std::fs::write;
use tempfile::tempdir;

#[test]
fn etag_of_empty_input_matches_qiniu() {
    assert_eq!(etag(b""), "Fto5o-5ea0sNMlW_75VgGJCv2AcJ");
}

#[test]
fn etag_of_small_buffer_uses_single_block_prefix() {
    let hash = etag(b"hello world");
    assert_eq!(hash, "FiqubDXJT8-0FdvpX0CLnOke6Ebt");
    assert!(hash.starts_with('F'), "single-block etags start with 0x16");
}

#[test]
fn etag_switches_to_multi_block_above_four_mib() {
    let exactly_one_block = vec![b'a'; BLOCK_SIZE];
    assert_eq!(etag(&exactly_one_block), "FuwQ-vpd56Izwiom1JHzCIdrQa4_");

    let one_byte_over = vec![b'a'; BLOCK_SIZE + 1];
    assert_eq!(etag(&one_byte_over), "lieGn00gWdbfwEIHaUpzu4drHeun");
}

#[test]
fn etag_of_three_blocks() {
    let zeros = vec![0u8; 9 * 1024 * 1024];
    assert_eq!(etag(&zeros), "lnGI9p-JfYjCCVFSI-mFSvtJXkyO");
}

#[tokio::test]
async fn hash_files_sets_hash_on_every_record() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    write(&a, b"hello world").unwrap();
    write(&b, b"").unwrap();

    let mut run = PublishRun::new();
    run.insert(FileRecord::new("a.txt".into(), a, "a.txt".into()));
    run.insert(FileRecord::new("b.txt".into(), b, "b.txt".into()));

    let hashed = hash_files(&mut run).await.expect("hashing should succeed");
    assert_eq!(hashed, 2);
    assert_eq!(
        run.get("a.txt").unwrap().content_hash.as_deref(),
        Some("FiqubDXJT8-0FdvpX0CLnOke6Ebt")
    );
    assert_eq!(
        run.get("b.txt").unwrap().content_hash.as_deref(),
        Some("Fto5o-5ea0sNMlW_75VgGJCv2AcJ")
    );

    // Already-hashed records are left alone.
    assert_eq!(hash_files(&mut run).await.unwrap(), 0);
}

#[tokio::test]
async fn hash_files_fails_on_unreadable_file() {
    let dir = tempdir().unwrap();
    let mut run = PublishRun::new();
    run.insert(FileRecord::new(
        "gone.txt".into(),
        dir.path().join("gone.txt"),
        "gone.txt".into(),
    ));

    let err = hash_files(&mut run).await.unwrap_err();
    assert_eq!(err.stage(), qiniu_publish_core::error::Stage::Hashing);
    assert_eq!(err.label(), "Hash files failed");
}
