use async_trait::async_trait;
use serde_json::Value;

use crate::core::error::DchatError;

/// Seam between the dispatcher and the network. The production
/// implementation posts over HTTPS; tests substitute a scripted transport.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
    ) -> Result<String, DchatError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, DchatError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
    ) -> Result<String, DchatError> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json");

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.json(body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DchatError::Transport(format!(
                "{} returned {}: {}",
                url,
                status,
                body.trim()
            )));
        }

        Ok(response.text().await?)
    }
}
