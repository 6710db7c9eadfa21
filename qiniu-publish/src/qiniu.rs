//! # Qiniu client
//!
//! [`QiniuClient`] is the concrete implementation of
//! [`qiniu_publish_core::contract::StorageBackend`] and [`qiniu_publish_core::contract::CdnBackend`]
//! used by the CLI. The core knows nothing about Qiniu's wire format; everything vendor-specific
//! lives here:
//!
//! - zone lookup through the UC service (`/v2/query`)
//! - batched `stat` through the RS service (`/batch`), signed with a `QBox` management token
//! - form uploads to the bucket's regional upload host, authorised by a put-policy upload token
//! - CDN refresh through the Fusion service (`/v2/tune/refresh`)
//!
//! All service base URLs live in [`QiniuEndpoints`] so they can be pointed at a local server.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use hmac::{Hmac, Mac};
use qiniu_publish_core::config::Credentials;
use qiniu_publish_core::contract::{
    CdnBackend, StatOutcome, StorageBackend, UploadCredential, UploadEndpoint, UploadScope,
};
use qiniu_publish_core::error::BackendError;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Lifetime of a minted upload token.
pub const UPLOAD_TOKEN_TTL: Duration = Duration::from_secs(3600);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const BATCH_PATH: &str = "/batch";
const ZONE_QUERY_PATH: &str = "/v2/query";
const REFRESH_PATH: &str = "/v2/tune/refresh";

/// Base URLs of the Qiniu services the client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QiniuEndpoints {
    pub uc_url: String,
    pub rs_url: String,
    pub fusion_url: String,
    /// Scheme prepended to the upload host returned by the zone lookup.
    pub upload_scheme: String,
}

impl Default for QiniuEndpoints {
    fn default() -> Self {
        Self {
            uc_url: "https://uc.qbox.me".to_string(),
            rs_url: "https://rs.qbox.me".to_string(),
            fusion_url: "https://fusion.qiniuapi.com".to_string(),
            upload_scheme: "https".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct QiniuClient {
    http: Client,
    credentials: Credentials,
    endpoints: QiniuEndpoints,
}

impl QiniuClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_endpoints(credentials, QiniuEndpoints::default())
    }

    pub fn with_endpoints(credentials: Credentials, endpoints: QiniuEndpoints) -> Self {
        tracing::info!(
            access_key = %credentials.access_key,
            rs_url = %endpoints.rs_url,
            "Initialized QiniuClient"
        );
        Self {
            http: Client::new(),
            credentials,
            endpoints,
        }
    }

    /// URL-safe base64 of `hmac_sha1(secret_key, data)`.
    pub fn sign(&self, data: &[u8]) -> String {
        let mut mac = HmacSha1::new_from_slice(self.credentials.secret_key.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(data);
        URL_SAFE.encode(mac.finalize().into_bytes())
    }

    /// `Authorization` header value for the management APIs.
    ///
    /// The signed data is the request path (with query), a newline, and the body when the body is
    /// form-encoded.
    pub fn management_authorization(&self, path_and_query: &str, form_body: Option<&[u8]>) -> String {
        let mut data = Vec::with_capacity(path_and_query.len() + 1);
        data.extend_from_slice(path_and_query.as_bytes());
        data.push(b'\n');
        if let Some(body) = form_body {
            data.extend_from_slice(body);
        }
        format!("QBox {}:{}", self.credentials.access_key, self.sign(&data))
    }

    /// Upload token for `scope`, valid until `deadline` (unix seconds).
    pub fn upload_token(&self, scope: &UploadScope, deadline: u64) -> String {
        let policy = serde_json::json!({
            "scope": scope.as_scope_string(),
            "deadline": deadline,
        })
        .to_string();
        let encoded_policy = URL_SAFE.encode(policy.as_bytes());
        let signature = self.sign(encoded_policy.as_bytes());
        format!(
            "{}:{}:{}",
            self.credentials.access_key, signature, encoded_policy
        )
    }
}

/// URL-safe base64 of `bucket:key`, the way Qiniu addresses one object.
pub fn encode_entry(bucket: &str, key: &str) -> String {
    URL_SAFE.encode(format!("{bucket}:{key}"))
}

fn transport(e: reqwest::Error) -> BackendError {
    BackendError::Transport(e.to_string())
}

/// Read the body and turn any status rejected by `accept` into a [`BackendError::Status`].
async fn read_body(
    response: Response,
    accept: impl Fn(StatusCode) -> bool,
) -> Result<String, BackendError> {
    let status = response.status();
    let body = response.text().await.map_err(transport)?;
    if !accept(status) {
        tracing::error!(status = %status, body = %body, "Qiniu API returned error");
        return Err(BackendError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

#[derive(Deserialize)]
struct ZoneQuery {
    up: UpHosts,
}

#[derive(Deserialize)]
struct UpHosts {
    #[serde(default)]
    acc: Option<HostGroup>,
    #[serde(default)]
    src: Option<HostGroup>,
}

#[derive(Deserialize)]
struct HostGroup {
    #[serde(default)]
    main: Vec<String>,
}

#[derive(Deserialize)]
struct StatItem {
    code: u16,
    #[serde(default)]
    data: Option<StatData>,
}

#[derive(Deserialize)]
struct StatData {
    #[serde(default)]
    hash: Option<String>,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    urls: &'a [String],
}

#[async_trait]
impl StorageBackend for QiniuClient {
    async fn locate_upload_endpoint(&self, bucket: &str) -> Result<UploadEndpoint, BackendError> {
        tracing::info!(bucket, "Querying upload zone");
        let response = self
            .http
            .get(format!("{}{}", self.endpoints.uc_url, ZONE_QUERY_PATH))
            .query(&[("ak", self.credentials.access_key.as_str()), ("bucket", bucket)])
            .send()
            .await
            .map_err(transport)?;
        let body = read_body(response, |status| status == StatusCode::OK).await?;

        let zone: ZoneQuery = serde_json::from_str(&body)
            .map_err(|e| BackendError::Protocol(format!("invalid zone response: {e}")))?;
        let host = [zone.up.acc, zone.up.src]
            .into_iter()
            .flatten()
            .flat_map(|group| group.main)
            .next()
            .ok_or_else(|| BackendError::Protocol("zone response lists no upload host".into()))?;

        let url = if host.contains("://") {
            host
        } else {
            format!("{}://{}", self.endpoints.upload_scheme, host)
        };
        tracing::info!(bucket, upload_url = %url, "Resolved upload zone");
        Ok(UploadEndpoint { url })
    }

    async fn stat_batch(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<Vec<StatOutcome>, BackendError> {
        let body = keys
            .iter()
            .map(|key| format!("op=/stat/{}", encode_entry(bucket, key)))
            .collect::<Vec<_>>()
            .join("&");
        let authorization = self.management_authorization(BATCH_PATH, Some(body.as_bytes()));
        tracing::debug!(bucket, count = keys.len(), "Sending stat batch");

        let response = self
            .http
            .post(format!("{}{}", self.endpoints.rs_url, BATCH_PATH))
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(transport)?;
        // 298 signals that some items failed (e.g. not found); the items carry their own codes.
        let body = read_body(response, |status| status.is_success()).await?;

        let items: Vec<StatItem> = serde_json::from_str(&body)
            .map_err(|e| BackendError::Protocol(format!("invalid stat response: {e}")))?;
        Ok(items
            .into_iter()
            .map(|item| StatOutcome {
                code: item.code,
                hash: item.data.and_then(|data| data.hash),
            })
            .collect())
    }

    fn mint_upload_credential(&self, scope: &UploadScope) -> UploadCredential {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default();
        UploadCredential(self.upload_token(scope, now + UPLOAD_TOKEN_TTL.as_secs()))
    }

    async fn put_object(
        &self,
        endpoint: &UploadEndpoint,
        credential: &UploadCredential,
        key: &str,
        body: Vec<u8>,
    ) -> Result<(), BackendError> {
        let file_name = key.rsplit('/').next().unwrap_or(key).to_string();
        let size = body.len();
        let form = Form::new()
            .text("token", credential.0.clone())
            .text("key", key.to_string())
            .part("file", Part::bytes(body).file_name(file_name));

        tracing::debug!(key, size, upload_url = %endpoint.url, "Uploading object");
        let response = self
            .http
            .post(&endpoint.url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        read_body(response, |status| status == StatusCode::OK).await?;
        tracing::info!(key, size, "Uploaded object");
        Ok(())
    }
}

#[async_trait]
impl CdnBackend for QiniuClient {
    async fn refresh_urls(&self, urls: &[String]) -> Result<(), BackendError> {
        let authorization = self.management_authorization(REFRESH_PATH, None);
        let response = self
            .http
            .post(format!("{}{}", self.endpoints.fusion_url, REFRESH_PATH))
            .header(AUTHORIZATION, authorization)
            .json(&RefreshRequest { urls })
            .send()
            .await
            .map_err(transport)?;
        read_body(response, |status| status == StatusCode::OK).await?;
        tracing::info!(count = urls.len(), "Refreshed CDN urls");
        Ok(())
    }
}
