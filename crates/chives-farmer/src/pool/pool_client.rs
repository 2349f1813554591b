//! Pool client abstraction
//!
//! Farmer only needs two calls from the pool: pool information at startup and partial submission.
//! They are abstracted away behind a trait so that the HTTP implementation can be replaced, for
//! instance in tests.

use crate::pool::PoolError;
use crate::protocol::{PoolInfo, SubmitPartial, SubmitPartialResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, trace};

/// Timeout of any request to the pool
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Abstraction of the pool API
#[async_trait]
pub trait PoolClient: fmt::Debug + Send + Sync + 'static {
    /// Get pool information
    async fn pool_info(&self) -> anyhow::Result<PoolInfo>;

    /// Submit a partial proof
    async fn submit_partial(
        &self,
        submit_partial: &SubmitPartial,
    ) -> anyhow::Result<SubmitPartialResponse>;
}

/// Pool client talking to the pool over HTTP with JSON bodies
#[derive(Debug, Clone)]
pub struct HttpPoolClient {
    client: Client,
    pool_url: String,
}

impl HttpPoolClient {
    /// Create a new instance for pool at `pool_url`
    pub fn new(pool_url: &str) -> Result<Self, PoolError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            pool_url: pool_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PoolClient for HttpPoolClient {
    async fn pool_info(&self) -> anyhow::Result<PoolInfo> {
        let url = format!("{}/pool_info", self.pool_url);
        debug!(%url, "Requesting pool info");

        let pool_info = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json::<PoolInfo>()
            .await?;

        trace!(?pool_info, "Received pool info");

        Ok(pool_info)
    }

    async fn submit_partial(
        &self,
        submit_partial: &SubmitPartial,
    ) -> anyhow::Result<SubmitPartialResponse> {
        let url = format!("{}/partial", self.pool_url);
        debug!(%url, difficulty = %submit_partial.difficulty, "Submitting partial");

        let response = self
            .client
            .post(&url)
            .json(submit_partial)
            .send()
            .await?
            .error_for_status()?
            .json::<SubmitPartialResponse>()
            .await?;

        trace!(?response, "Partial accepted");

        Ok(response)
    }
}
