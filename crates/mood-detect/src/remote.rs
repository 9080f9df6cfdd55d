use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use mood_capture::EncodedFrame;

use crate::{DetectError, DetectionResult};

/// HTTP client for the external detection service.
///
/// One `POST {base_url}/detect` per call; no retries, no queueing. The
/// caller serializes requests by awaiting each one to completion.
pub struct RemoteClassifier {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct DetectRequest<'a> {
    image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

impl RemoteClassifier {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DetectError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DetectError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn classify(
        &self,
        frame: &EncodedFrame,
        model: Option<&str>,
    ) -> Result<DetectionResult, DetectError> {
        let url = format!("{}/detect", self.base_url);
        let started = std::time::Instant::now();

        let resp = self
            .http
            .post(&url)
            .json(&DetectRequest { image: frame.to_data_url(), model })
            .send()
            .await
            .map_err(|e| DetectError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or_else(|| "Failed to detect emotion".to_string());
            return Err(DetectError::Service { status: status.as_u16(), message });
        }

        let result: DetectionResult = resp
            .json()
            .await
            .map_err(|e| DetectError::Response(e.to_string()))?;
        result.validate()?;

        debug!(
            "remote: {} ({:.1}%) in {}ms",
            result.primary_emotion,
            result.confidence,
            started.elapsed().as_millis()
        );
        Ok(result)
    }
}
