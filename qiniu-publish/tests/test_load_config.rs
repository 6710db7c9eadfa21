use qiniu_publish::load_config::{load_config, parse_config, ACCESS_KEY_ENV, SECRET_KEY_ENV};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

fn clear_env() {
    env::remove_var(ACCESS_KEY_ENV);
    env::remove_var(SECRET_KEY_ENV);
}

/// A package.json with a single bucket task object is accepted as-is.
#[test]
#[serial]
fn parses_single_task_from_package_json() {
    clear_env();
    let package_json = r#"{
  "name": "my-site",
  "version": "1.0.0",
  "scripts": { "build": "webpack" },
  "publishToQiniu": {
    "accessKey": "AK",
    "secretKey": "SK",
    "bucket": "assets",
    "hosts": ["https://cdn.example.com", "https://static.example.com/"],
    "tasks": [
      { "from": "dist", "to": "site" },
      { "from": "public" }
    ]
  }
}"#;

    let tasks = parse_config(package_json, Path::new("/work")).expect("config parses");

    assert_eq!(tasks.len(), 1);
    let task = &tasks[0];
    assert_eq!(task.bucket, "assets");
    assert_eq!(task.credentials.access_key, "AK");
    assert_eq!(task.credentials.secret_key, "SK");
    assert_eq!(
        task.hosts,
        vec!["https://cdn.example.com", "https://static.example.com/"]
    );
    assert_eq!(task.mappings.len(), 2);
    assert_eq!(task.mappings[0].from, PathBuf::from("/work/dist"));
    assert_eq!(task.mappings[0].to, "site");
    assert_eq!(task.mappings[1].from, PathBuf::from("/work/public"));
    assert_eq!(task.mappings[1].to, "");
}

/// An array of tasks keeps its order, and YAML works like JSON.
#[test]
#[serial]
fn parses_task_array_from_yaml() {
    clear_env();
    let config_yaml = r#"
publishToQiniu:
  - accessKey: AK1
    secretKey: SK1
    bucket: first
    tasks:
      - from: /abs/out
        to: v1
  - accessKey: AK2
    secretKey: SK2
    bucket: second
"#;

    let tasks = parse_config(config_yaml, Path::new("/work")).expect("config parses");

    let buckets: Vec<&str> = tasks.iter().map(|t| t.bucket.as_str()).collect();
    assert_eq!(buckets, vec!["first", "second"]);
    assert_eq!(tasks[0].mappings[0].from, PathBuf::from("/abs/out"));
    assert!(tasks[1].hosts.is_empty());
    assert!(tasks[1].mappings.is_empty());
}

#[test]
#[serial]
fn secrets_fall_back_to_environment() {
    clear_env();
    env::set_var(ACCESS_KEY_ENV, "ENV_AK");
    env::set_var(SECRET_KEY_ENV, "ENV_SK");

    let config = r#"{ "publishToQiniu": { "bucket": "assets", "accessKey": "FILE_AK" } }"#;
    let tasks = parse_config(config, Path::new("/work")).expect("config parses");
    clear_env();

    assert_eq!(tasks[0].credentials.access_key, "FILE_AK");
    assert_eq!(tasks[0].credentials.secret_key, "ENV_SK");
}

#[test]
#[serial]
fn missing_secret_is_an_error() {
    clear_env();
    let config = r#"{ "publishToQiniu": { "bucket": "assets", "accessKey": "AK" } }"#;

    let err = parse_config(config, Path::new("/work")).expect_err("secret key is required");
    let message = format!("{err:#}");
    assert!(message.contains("[assets]"), "unexpected error: {message}");
    assert!(message.contains(SECRET_KEY_ENV), "unexpected error: {message}");
}

#[test]
#[serial]
fn missing_section_is_an_error() {
    clear_env();
    let err = parse_config(r#"{ "name": "my-site" }"#, Path::new("/work"))
        .expect_err("publishToQiniu is required");
    assert!(err.to_string().contains("publishToQiniu"));
}

#[test]
#[serial]
fn load_config_reads_file_from_disk() {
    clear_env();
    let config_file = NamedTempFile::new().expect("temp file");
    write(
        config_file.path(),
        r#"{ "publishToQiniu": { "accessKey": "AK", "secretKey": "SK", "bucket": "assets", "tasks": [{ "from": "dist", "to": "" }] } }"#,
    )
    .unwrap();

    let tasks = load_config(config_file.path()).expect("config loads");

    let cwd = env::current_dir().unwrap();
    assert_eq!(tasks[0].mappings[0].from, cwd.join("dist"));
}

#[test]
#[serial]
fn load_config_fails_for_missing_file() {
    let err = load_config("/definitely/not/here/package.json").expect_err("file is missing");
    assert!(err.to_string().contains("Failed to read config file"));
}
