/// `load_config` module: Loads the `publishToQiniu` section of a project manifest into core [`BucketTask`]s.
///
/// This is the only place where user-supplied configuration is parsed and mapped to the strongly-typed
/// structs of `qiniu-publish-core`.
///
/// # Responsibilities
/// - Read the config file (`package.json` by default) and pick out its `publishToQiniu` key
/// - Accept either a single bucket task object or an array of them
/// - Fill in missing secrets from `QINIU_ACCESS_KEY` / `QINIU_SECRET_KEY`
/// - Resolve every mapping's `from` folder against a base directory (the working directory for the CLI)
///
/// The file is parsed with `serde_yaml`, so both the JSON manifest and an equivalent YAML document
/// are accepted.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::{anyhow, Context, Result};
use qiniu_publish_core::config::{BucketTask, Credentials, FolderMapping};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub const ACCESS_KEY_ENV: &str = "QINIU_ACCESS_KEY";
pub const SECRET_KEY_ENV: &str = "QINIU_SECRET_KEY";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    publish_to_qiniu: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RawBucketTask>),
    One(RawBucketTask),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<RawBucketTask> {
        match self {
            OneOrMany::Many(tasks) => tasks,
            OneOrMany::One(task) => vec![task],
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBucketTask {
    #[serde(default)]
    access_key: Option<String>,
    #[serde(default)]
    secret_key: Option<String>,
    bucket: String,
    #[serde(default)]
    hosts: Vec<String>,
    #[serde(default)]
    tasks: Vec<RawMapping>,
}

#[derive(Debug, Deserialize)]
struct RawMapping {
    from: String,
    #[serde(default)]
    to: String,
}

/// Loads bucket tasks from the config file at `path`, resolving folders against the working directory.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Vec<BucketTask>> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
        anyhow!("Failed to read config file {:?}: {}", path_ref, e)
    })?;
    info!(config_path = ?path_ref, "Config file read successfully");

    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    parse_config(&content, &cwd)
}

/// Parses config `content`, resolving relative `from` folders against `base_dir`.
pub fn parse_config(content: &str, base_dir: &Path) -> Result<Vec<BucketTask>> {
    let manifest: Manifest = serde_yaml::from_str(content).map_err(|e| {
        error!(error = ?e, "Failed to parse config");
        anyhow!("Failed to parse config: {e}")
    })?;

    let raw_tasks = manifest
        .publish_to_qiniu
        .ok_or_else(|| anyhow!("Config has no `publishToQiniu` section"))?
        .into_vec();
    if raw_tasks.is_empty() {
        warn!("`publishToQiniu` lists no bucket tasks");
    }

    let tasks = raw_tasks
        .into_iter()
        .map(|raw| into_bucket_task(raw, base_dir))
        .collect::<Result<Vec<_>>>()?;
    for task in &tasks {
        task.trace_loaded();
    }
    info!(tasks = tasks.len(), "Parsed bucket tasks successfully");
    Ok(tasks)
}

fn into_bucket_task(raw: RawBucketTask, base_dir: &Path) -> Result<BucketTask> {
    let access_key = secret_or_env(raw.access_key, ACCESS_KEY_ENV)
        .with_context(|| format!("Bucket task [{}] has no access key", raw.bucket))?;
    let secret_key = secret_or_env(raw.secret_key, SECRET_KEY_ENV)
        .with_context(|| format!("Bucket task [{}] has no secret key", raw.bucket))?;

    let mappings = raw
        .tasks
        .into_iter()
        .map(|mapping| FolderMapping {
            from: base_dir.join(mapping.from),
            to: mapping.to,
        })
        .collect();

    Ok(BucketTask {
        bucket: raw.bucket,
        credentials: Credentials {
            access_key,
            secret_key,
        },
        hosts: raw.hosts,
        mappings,
    })
}

fn secret_or_env(value: Option<String>, var: &str) -> Result<String> {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => Ok(v),
        None => std::env::var(var)
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("set it in the config or in the {var} environment variable")),
    }
}
