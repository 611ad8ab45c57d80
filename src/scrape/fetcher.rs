use std::time::Duration;

use reqwest::header::REFERER;
use reqwest::Client;

use crate::error::{AppError, Result};

const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122 Safari/537.36";

/// Thin wrapper over a pooled reqwest client. Connections are reused
/// across list and article fetches within one process.
pub struct PageFetcher {
    client: Client,
}

impl PageFetcher {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT_STRING)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// GET a page as text. Non-2xx statuses are errors; callers catch
    /// per-site / per-article so one failure never aborts a pass.
    pub async fn get(&self, url: &str, referer: Option<&str>) -> Result<String> {
        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(AppError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}

impl Default for PageFetcher {
    fn default() -> Self {
        Self::new()
    }
}
