use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use mood_capture::EncodedFrame;

use crate::{DetectConfig, DetectError, DetectionResult, FallbackClassifier, RemoteClassifier};

#[derive(Clone)]
enum Resolution {
    Pending,
    Ready(Arc<RemoteClassifier>),
    Unavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Remote,
    Fallback,
}

/// Single call-site handle over both strategies.
///
/// Remote resolution runs once, in a task spawned at construction. A call
/// landing before it completes, or after it fails, uses the fallback;
/// resolution is never retried.
pub struct DetectorHandle {
    rx: watch::Receiver<Resolution>,
    fallback: FallbackClassifier,
    default_model: Option<String>,
}

impl DetectorHandle {
    pub fn resolve(cfg: DetectConfig) -> Self {
        let (tx, rx) = watch::channel(Resolution::Pending);
        let fallback = FallbackClassifier::new(Duration::from_millis(cfg.fallback_delay_ms));
        let timeout = Duration::from_secs(cfg.timeout_s);
        let endpoint = cfg.endpoint;

        tokio::spawn(async move {
            let resolution = match endpoint.as_deref() {
                Some(url) if !url.is_empty() => match RemoteClassifier::new(url, timeout) {
                    Ok(remote) => {
                        info!("detect: remote classifier ready at {}", url);
                        Resolution::Ready(Arc::new(remote))
                    }
                    Err(e) => {
                        warn!("detect: remote classifier unavailable ({e}); synthesized results from here on");
                        Resolution::Unavailable
                    }
                },
                _ => {
                    info!("detect: no endpoint configured; synthesized results only");
                    Resolution::Unavailable
                }
            };
            let _ = tx.send(resolution);
        });

        Self { rx, fallback, default_model: cfg.model }
    }

    /// Strategy a call issued right now would use.
    pub fn active(&self) -> ClassifierKind {
        match &*self.rx.borrow() {
            Resolution::Ready(_) => ClassifierKind::Remote,
            Resolution::Pending | Resolution::Unavailable => ClassifierKind::Fallback,
        }
    }

    pub async fn classify(
        &self,
        frame: &EncodedFrame,
        model: Option<&str>,
    ) -> Result<DetectionResult, DetectError> {
        let model = model.or(self.default_model.as_deref());
        let snapshot = self.rx.borrow().clone();
        match snapshot {
            Resolution::Ready(remote) => remote.classify(frame, model).await,
            Resolution::Pending | Resolution::Unavailable => {
                self.fallback.classify(frame, model).await
            }
        }
    }
}
