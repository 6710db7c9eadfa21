//! CDN cache refresh for files whose remote content was replaced.

use tracing::{error, info};

use crate::contract::CdnBackend;
use crate::error::PublishError;

/// Upper bound on URLs combined into one refresh request.
pub const REFRESH_BATCH_SIZE: usize = 100;

/// Build the refresh list: every host's root first, then every path under every host.
pub fn build_refresh_urls(hosts: &[String], remote_paths: &[String]) -> Vec<String> {
    let hosts: Vec<&str> = hosts.iter().map(|host| host.trim_end_matches('/')).collect();
    let mut urls = Vec::with_capacity(hosts.len() * (remote_paths.len() + 1));
    for host in &hosts {
        urls.push(format!("{host}/"));
    }
    for remote_path in remote_paths {
        for host in &hosts {
            urls.push(format!("{host}/{remote_path}"));
        }
    }
    urls
}

/// Send `urls` in batches, each one after the previous completed. Returns the number of batches.
pub async fn refresh_urls<C>(cdn: &C, urls: &[String]) -> Result<usize, PublishError>
where
    C: CdnBackend + ?Sized,
{
    let mut batches = 0;
    for (index, chunk) in urls.chunks(REFRESH_BATCH_SIZE).enumerate() {
        let batch = index + 1;
        info!(batch, urls = ?chunk, "Refreshing url batch");
        cdn.refresh_urls(chunk).await.map_err(|source| {
            error!(batch, error = %source, "Refresh batch failed, skipping remaining batches");
            PublishError::Invalidation { batch, source }
        })?;
        batches += 1;
    }
    info!(urls = urls.len(), batches, "Refreshed urls");
    Ok(batches)
}
