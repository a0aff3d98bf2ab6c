use anyhow::Context;
use lc_lens_client::LensProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use super::parse_url;

pub const LENS_DEFAULT_API_URL: &str = "https://api.lens.dev";

#[derive(Clone, Debug, clap::Args, Deserialize, Serialize)]
pub struct LensParams {
    /// Lens GraphQL API the indexing status and publications are queried from.
    #[arg(
        env = "LENSQ_API_URL",
        long,
        value_parser = parse_url,
        value_name = "URL",
        default_value = LENS_DEFAULT_API_URL
    )]
    pub api_url: Url,

    /// Access token of the signed in profile. Sent as `x-access-token`.
    #[arg(env = "LENSQ_ACCESS_TOKEN", long, value_name = "TOKEN")]
    pub access_token: Option<String>,

    /// Timeout of a single API request, in seconds.
    #[arg(env = "LENSQ_REQUEST_TIMEOUT", long, value_name = "SECONDS", default_value_t = 20)]
    pub request_timeout: u64,
}

impl LensParams {
    pub fn provider(&self) -> anyhow::Result<LensProvider> {
        let provider = LensProvider::with_timeout(self.api_url.clone(), Duration::from_secs(self.request_timeout))
            .context("Building the Lens API client")?;
        match &self.access_token {
            Some(token) => provider.with_access_token(token).context("Invalid access token"),
            None => Ok(provider),
        }
    }
}
