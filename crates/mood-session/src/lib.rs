mod controller;

use mood_detect::DetectionResult;

pub use controller::{SessionController, CAMERA_ERROR_MSG, DETECT_ERROR_MSG, TRANSPORT_ERROR_MSG};

/// Observable session snapshot consumed by the presentation layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub camera_open: bool,
    pub is_loading: bool,
    pub last_result: Option<DetectionResult>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_cleared() {
        let state = SessionState::default();
        assert!(!state.camera_open);
        assert!(!state.is_loading);
        assert!(state.last_result.is_none());
        assert!(state.last_error.is_none());
    }
}
