use std::sync::Mutex;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use mood_capture::FrameSource;
use mood_detect::{DetectError, DetectorHandle};

use crate::SessionState;

pub const CAMERA_ERROR_MSG: &str = "Could not access camera. Please check permissions.";
pub const DETECT_ERROR_MSG: &str = "Failed to detect emotion. Please try again.";
pub const TRANSPORT_ERROR_MSG: &str = "Could not reach the detection service. Please try again.";

/// Orchestrates open -> capture -> detect -> publish over one camera.
///
/// All failures end up as state updates, never as propagated errors. The
/// lock is only held across non-await sections; an epoch counter, bumped on
/// close and teardown, keeps late-arriving detection results from mutating
/// state they no longer belong to.
pub struct SessionController {
    inner: Mutex<Inner>,
    detector: DetectorHandle,
    tx: watch::Sender<SessionState>,
}

struct Inner {
    source: Box<dyn FrameSource>,
    state: SessionState,
    epoch: u64,
}

impl SessionController {
    pub fn new(source: Box<dyn FrameSource>, detector: DetectorHandle) -> Self {
        let state = SessionState::default();
        let (tx, _) = watch::channel(state.clone());
        Self {
            inner: Mutex::new(Inner { source, state, epoch: 0 }),
            detector,
            tx,
        }
    }

    /// Presentation-layer observer; receives a snapshot on every mutation.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().unwrap().state.clone()
    }

    pub fn detector(&self) -> &DetectorHandle {
        &self.detector
    }

    /// Returns whether the camera is open afterwards.
    pub fn open_camera(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.state.camera_open {
            return true;
        }
        match inner.source.open() {
            Ok(()) => {
                inner.state.camera_open = true;
                inner.state.last_error = None;
                info!("session: camera open");
            }
            Err(e) => {
                warn!("session: camera open failed: {e}");
                inner.state.last_error = Some(CAMERA_ERROR_MSG.to_string());
            }
        }
        let open = inner.state.camera_open;
        let _ = self.tx.send(inner.state.clone());
        open
    }

    /// Idempotent. Retains the last result and error; a detection still in
    /// flight becomes stale and its completion is discarded.
    pub fn close_camera(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.epoch += 1;
        inner.source.close();
        if inner.state.camera_open || inner.state.is_loading {
            info!("session: camera closed");
        }
        inner.state.camera_open = false;
        inner.state.is_loading = false;
        let _ = self.tx.send(inner.state.clone());
    }

    /// Session end. The camera must be released even when the presentation
    /// layer never asked to close it.
    pub fn teardown(&self) {
        debug!("session: teardown");
        self.close_camera();
    }

    /// One capture-and-classify pass. Returns false when the call was
    /// ignored because another detection is in flight; the outcome of a ran
    /// detection lands in the observable state, not in the return value.
    pub async fn detect(&self, model: Option<&str>) -> bool {
        let (frame, epoch) = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state.is_loading {
                debug!("session: detect ignored, another detection in flight");
                return false;
            }
            inner.state.is_loading = true;
            inner.state.last_error = None;
            let _ = self.tx.send(inner.state.clone());
            (inner.source.capture_frame(), inner.epoch)
        };

        let outcome = match frame {
            Ok(frame) => self.detector.classify(&frame, model).await,
            Err(e) => Err(DetectError::from(e)),
        };

        let mut inner = self.inner.lock().unwrap();
        if inner.epoch != epoch {
            info!("session: stale detection result discarded");
            return true;
        }
        inner.state.is_loading = false;
        match outcome {
            Ok(result) => {
                info!(
                    "session: detected {} ({:.1}%)",
                    result.primary_emotion, result.confidence
                );
                inner.state.last_result = Some(result);
                inner.state.last_error = None;
            }
            Err(e) => {
                warn!("session: detection failed: {e}");
                inner.state.last_result = None;
                inner.state.last_error = Some(user_message(&e));
            }
        }
        let _ = self.tx.send(inner.state.clone());
        true
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.get_mut() {
            inner.source.close();
        }
    }
}

fn user_message(err: &DetectError) -> String {
    match err {
        DetectError::Service { message, .. } => message.clone(),
        DetectError::Transport(_) => TRANSPORT_ERROR_MSG.to_string(),
        DetectError::Response(_) | DetectError::Capture(_) => DETECT_ERROR_MSG.to_string(),
    }
}
