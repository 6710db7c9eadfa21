use qiniu_publish_core::config::FolderMapping;
use qiniu_publish_core::enumerate::{enumerate_files, join_remote_path, list_mapping};
use qiniu_publish_core::error::{PublishError, Stage};
use qiniu_publish_core::run::FileStatus;
use std::fs::{create_dir_all, write};
use std::path::Path;
use tempfile::tempdir;

fn touch(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    create_dir_all(path.parent().unwrap()).unwrap();
    write(path, content).unwrap();
}

#[tokio::test]
async fn enumerates_nested_files_under_remote_prefix() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "index.html", "<html/>");
    touch(dir.path(), "js/app.js", "console.log(1)");
    touch(dir.path(), "img/icons/logo.svg", "<svg/>");

    let mappings = vec![FolderMapping {
        from: dir.path().to_path_buf(),
        to: "static/v1".to_string(),
    }];
    let run = enumerate_files(&mappings).await.expect("enumeration succeeds");

    let keys: Vec<&str> = run.files.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["img/icons/logo.svg", "index.html", "js/app.js"]);

    let record = run.get("js/app.js").unwrap();
    assert_eq!(record.remote_path, "static/v1/js/app.js");
    assert_eq!(record.local_path, dir.path().join("js").join("app.js"));
    assert_eq!(record.status, FileStatus::Unknown);
    assert!(record.content_hash.is_none());
}

#[tokio::test]
async fn directories_and_hidden_entries_are_not_listed() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "visible.txt", "x");
    touch(dir.path(), ".DS_Store", "x");
    touch(dir.path(), ".git/config", "x");
    create_dir_all(dir.path().join("empty")).unwrap();

    let records = list_mapping(&FolderMapping {
        from: dir.path().to_path_buf(),
        to: String::new(),
    })
    .unwrap();

    let paths: Vec<&str> = records.iter().map(|r| r.relative_path.as_str()).collect();
    assert_eq!(paths, vec!["visible.txt"]);
    assert_eq!(records[0].remote_path, "visible.txt");
}

#[tokio::test]
async fn later_mapping_wins_on_relative_path_collision() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    touch(first.path(), "shared.css", "first");
    touch(first.path(), "only-first.css", "first");
    touch(second.path(), "shared.css", "second");

    let mappings = vec![
        FolderMapping {
            from: first.path().to_path_buf(),
            to: "a".into(),
        },
        FolderMapping {
            from: second.path().to_path_buf(),
            to: "b".into(),
        },
    ];
    let run = enumerate_files(&mappings).await.unwrap();

    assert_eq!(run.len(), 2);
    let shared = run.get("shared.css").unwrap();
    assert_eq!(shared.local_path, second.path().join("shared.css"));
    assert_eq!(shared.remote_path, "b/shared.css");
    assert_eq!(run.get("only-first.css").unwrap().remote_path, "a/only-first.css");
}

#[tokio::test]
async fn missing_folder_is_an_enumeration_error() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");
    let mappings = vec![
        FolderMapping {
            from: dir.path().to_path_buf(),
            to: String::new(),
        },
        FolderMapping {
            from: missing.clone(),
            to: String::new(),
        },
    ];

    let err = enumerate_files(&mappings).await.unwrap_err();
    assert_eq!(err.stage(), Stage::Enumeration);
    assert_eq!(err.label(), "Load files failed");
    match err {
        PublishError::Enumeration { folder, .. } => assert_eq!(folder, missing),
        other => panic!("expected enumeration error, got {other:?}"),
    }
}

#[test]
fn remote_paths_are_normalized_to_forward_slashes() {
    assert_eq!(join_remote_path("", "a.txt"), "a.txt");
    assert_eq!(join_remote_path(".", "a.txt"), "a.txt");
    assert_eq!(join_remote_path("static/", "css/a.css"), "static/css/a.css");
    assert_eq!(join_remote_path("static\\v2", "a.css"), "static/v2/a.css");
    assert_eq!(join_remote_path("./assets//img", "x.png"), "assets/img/x.png");
    assert_eq!(join_remote_path("assets/../public", "x.png"), "public/x.png");
    assert_eq!(join_remote_path("/cdn", "x.png"), "/cdn/x.png");
}
