//! Release provider abstraction and the GitHub REST implementation
//!
//! The engine only speaks `ReleaseProvider`; tests substitute an in-memory
//! implementation and never touch the network.

use super::coordinate::Dep;
use super::error::{ResolveError, ResolveResult};
use crate::config::Settings;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, warn};

/// One downloadable file attached to a remote release.
///
/// `url` is the provider's download handle for the asset, opaque to the
/// engine. Serialized as part of the metadata cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub url: String,
}

/// A remote release: its tag and asset listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag: String,
    pub assets: Vec<ReleaseAsset>,
}

impl Release {
    /// Names of all attached assets, in listing order.
    pub fn asset_names(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.name.clone()).collect()
    }

    /// Look up an asset by exact name.
    pub fn asset(&self, name: &str) -> Option<&ReleaseAsset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// Capability to list a release's assets and download one of them.
pub trait ReleaseProvider {
    /// Fetch the release tagged with the dependency's version.
    fn release_by_tag(&self, dep: &Dep) -> ResolveResult<Release>;

    /// Stream an asset's bytes into `out`, returning the byte count.
    fn download_asset(
        &self,
        dep: &Dep,
        asset: &ReleaseAsset,
        out: &mut dyn Write,
    ) -> ResolveResult<u64>;
}

/// GitHub (and GitHub-Enterprise-compatible) release provider over the
/// REST API, using blocking HTTP with a fixed timeout and bounded retry.
pub struct GithubProvider {
    client: reqwest::blocking::Client,
    settings: Settings,
    /// Overrides API base resolution; used against compatible test servers.
    api_base: Option<String>,
}

impl GithubProvider {
    pub fn new(settings: &Settings) -> ResolveResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.network.timeout_secs))
            .user_agent(concat!("bz/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            settings: settings.clone(),
            api_base: None,
        })
    }

    /// Point every API call at a fixed base URL instead of deriving it
    /// from the dependency's server host.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// API base for a host: api.github.com for github.com proper, the
    /// conventional `/api/v3` prefix for enterprise hosts.
    fn api_base_for(&self, server: &str) -> String {
        if let Some(base) = &self.api_base {
            return base.trim_end_matches('/').to_string();
        }
        if server.eq_ignore_ascii_case("github.com") {
            "https://api.github.com".to_string()
        } else {
            format!("https://{server}/api/v3")
        }
    }

    fn authorize(
        &self,
        req: reqwest::blocking::RequestBuilder,
        server: &str,
    ) -> reqwest::blocking::RequestBuilder {
        match self.settings.server_token(server) {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Retry transient transport failures and 5xx responses with a fixed
    /// pause, bounded by `network.retries`.
    fn with_retry<T>(&self, mut f: impl FnMut() -> ResolveResult<T>) -> ResolveResult<T> {
        let mut remaining = self.settings.network.retries;
        loop {
            match f() {
                Ok(value) => return Ok(value),
                Err(e) if remaining > 0 && is_transient(&e) => {
                    remaining -= 1;
                    warn!("transient network failure, retrying: {e}");
                    std::thread::sleep(Duration::from_millis(self.settings.network.backoff_ms));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(err: &ResolveError) -> bool {
    match err {
        ResolveError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status().is_some_and(|s| s.is_server_error())
        }
        _ => false,
    }
}

/// Wire shape of a GitHub release, reduced to the fields we keep.
#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    url: String,
}

impl ReleaseProvider for GithubProvider {
    fn release_by_tag(&self, dep: &Dep) -> ResolveResult<Release> {
        let url = format!(
            "{}/repos/{}/{}/releases/tags/{}",
            self.api_base_for(&dep.server),
            dep.owner,
            dep.repo,
            dep.version
        );
        debug!(%url, "fetching release metadata");

        self.with_retry(|| {
            let response = self
                .authorize(self.client.get(&url), &dep.server)
                .header("Accept", "application/vnd.github+json")
                .send()?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Err(ResolveError::ReleaseNotFound {
                    dep: dep.to_string(),
                    tag: dep.version.clone(),
                });
            }

            let release: GithubRelease = response.error_for_status()?.json()?;
            Ok(Release {
                tag: release.tag_name,
                assets: release
                    .assets
                    .into_iter()
                    .map(|a| ReleaseAsset {
                        name: a.name,
                        url: a.url,
                    })
                    .collect(),
            })
        })
    }

    fn download_asset(
        &self,
        dep: &Dep,
        asset: &ReleaseAsset,
        out: &mut dyn Write,
    ) -> ResolveResult<u64> {
        debug!(asset = %asset.name, url = %asset.url, "downloading asset");

        // Only establishing the response is retried. Retrying after a
        // failed body copy would append to partially written output.
        let mut response = self.with_retry(|| {
            Ok(self
                .authorize(self.client.get(&asset.url), &dep.server)
                .header("Accept", "application/octet-stream")
                .send()?
                .error_for_status()?)
        })?;

        Ok(response.copy_to(out)?)
    }
}
