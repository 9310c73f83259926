//! Blocking HTTP client for the cluster version resource

use std::time::Duration;

use anyhow::{bail, Context};
use thiserror::Error;
use url::Url;

use super::cluster::{ClusterVersion, ClusterVersionsGetter};

const CLUSTER_VERSIONS_PATH: &str = "apis/config.openshift.io/v1/clusterversions/";

#[derive(Debug, Error)]
pub enum KubeClientError {
    #[error("invalid API server URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Configuration for [`KubeClusterVersionClient`]
#[derive(Debug, Clone)]
pub struct KubeClientConfig {
    pub api_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub user_agent: String,
}

impl KubeClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            token: None,
            timeout: Duration::from_secs(30),
            user_agent: format!("olm-resolver/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Reads `clusterversions.config.openshift.io` from the API server
#[derive(Debug)]
pub struct KubeClusterVersionClient {
    client: reqwest::blocking::Client,
    base: Url,
    token: Option<String>,
}

impl KubeClusterVersionClient {
    pub fn new(config: KubeClientConfig) -> Result<Self, KubeClientError> {
        // A base without a trailing slash would drop its last segment on join
        let mut raw = config.api_url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        let base = Url::parse(&raw).map_err(|source| KubeClientError::InvalidUrl {
            url: config.api_url.clone(),
            source,
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            base,
            token: config.token,
        })
    }

    /// URL of a named cluster version resource
    pub fn resource_url(&self, name: &str) -> Result<Url, url::ParseError> {
        self.base.join(CLUSTER_VERSIONS_PATH)?.join(name)
    }
}

impl ClusterVersionsGetter for KubeClusterVersionClient {
    fn get(&self, name: &str) -> anyhow::Result<Option<ClusterVersion>> {
        let url = self.resource_url(name)?;
        log::debug!("GET {}", url);

        let mut request = self.client.get(url.clone()).header("Accept", "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().with_context(|| format!("request to {} failed", url))?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            bail!("clusterversions.config.openshift.io \"{}\" not found", name);
        }
        if !status.is_success() {
            bail!("API server returned {} for {}", status, url);
        }

        let resource = response
            .json::<ClusterVersion>()
            .context("invalid cluster version resource")?;
        Ok(Some(resource))
    }
}
