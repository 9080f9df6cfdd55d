pub mod fallback;
pub mod remote;
mod resolve;

use serde::{Deserialize, Serialize};

pub use fallback::FallbackClassifier;
pub use remote::RemoteClassifier;
pub use resolve::{ClassifierKind, DetectorHandle};

use mood_capture::CaptureError;

/// Closed emotion-category set. Wire aliases cover the raw label spellings
/// common face-expression models emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    #[serde(alias = "Happiness")]
    Happy,
    #[serde(alias = "Sadness")]
    Sad,
    #[serde(alias = "Anger")]
    Angry,
    #[serde(alias = "Surprise")]
    Surprised,
    Neutral,
    #[serde(alias = "Fear")]
    Fearful,
    #[serde(alias = "Disgust")]
    Disgusted,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Surprised,
        Emotion::Neutral,
        Emotion::Fearful,
        Emotion::Disgusted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "Happy",
            Emotion::Sad => "Sad",
            Emotion::Angry => "Angry",
            Emotion::Surprised => "Surprised",
            Emotion::Neutral => "Neutral",
            Emotion::Fearful => "Fearful",
            Emotion::Disgusted => "Disgusted",
        }
    }

    fn index(self) -> usize {
        match self {
            Emotion::Happy => 0,
            Emotion::Sad => 1,
            Emotion::Angry => 2,
            Emotion::Surprised => 3,
            Emotion::Neutral => 4,
            Emotion::Fearful => 5,
            Emotion::Disgusted => 6,
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionScore {
    pub emotion: Emotion,
    /// Fraction in [0, 1].
    pub confidence: f32,
}

/// Allowed drift between the percentage field and the top score, to absorb
/// display rounding done service-side.
const CONFIDENCE_TOLERANCE_PCT: f32 = 0.5;

/// Classification outcome. The struct is also the wire shape of the
/// service's success body (camelCase keys, `confidence` in percent,
/// per-score confidences as fractions).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub primary_emotion: Emotion,
    /// Percent, 0-100.
    pub confidence: f32,
    /// Sorted descending; one score per category.
    pub all_results: Vec<EmotionScore>,
}

impl DetectionResult {
    /// Orders the scores and derives the primary fields from the head.
    pub fn from_scores(mut scores: Vec<EmotionScore>) -> Result<Self, DetectError> {
        scores.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let head = scores
            .first()
            .copied()
            .ok_or_else(|| DetectError::Response("empty score set".into()))?;
        let result = Self {
            primary_emotion: head.emotion,
            confidence: head.confidence * 100.0,
            all_results: scores,
        };
        result.validate()?;
        Ok(result)
    }

    /// Checks the invariants every result must hold: full category coverage
    /// exactly once, descending order, and primary fields matching the head.
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.all_results.len() != Emotion::ALL.len() {
            return Err(DetectError::Response(format!(
                "expected {} scores, got {}",
                Emotion::ALL.len(),
                self.all_results.len()
            )));
        }
        let mut seen = [false; Emotion::ALL.len()];
        for score in &self.all_results {
            if seen[score.emotion.index()] {
                return Err(DetectError::Response(format!(
                    "duplicate score for {}",
                    score.emotion
                )));
            }
            seen[score.emotion.index()] = true;
            if !(0.0..=1.0).contains(&score.confidence) {
                return Err(DetectError::Response(format!(
                    "confidence {} for {} outside [0,1]",
                    score.confidence, score.emotion
                )));
            }
        }
        if self
            .all_results
            .windows(2)
            .any(|pair| pair[0].confidence < pair[1].confidence)
        {
            return Err(DetectError::Response("scores not sorted descending".into()));
        }
        let head = &self.all_results[0];
        if head.emotion != self.primary_emotion {
            return Err(DetectError::Response(
                "primaryEmotion does not match top score".into(),
            ));
        }
        if (self.confidence - head.confidence * 100.0).abs() > CONFIDENCE_TOLERANCE_PCT {
            return Err(DetectError::Response(
                "confidence does not match top score".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DetectError {
    /// Non-2xx with the service's own message.
    #[error("detection service error (http {status}): {message}")]
    Service { status: u16, message: String },
    /// Network unreachable, timeout, connection refused.
    #[error("detection transport failure: {0}")]
    Transport(String),
    /// 2xx body that does not hold a valid result.
    #[error("malformed detection response: {0}")]
    Response(String),
    #[error(transparent)]
    Capture(#[from] CaptureError),
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct DetectConfig {
    /// Base URL of the detection service. Absent -> fallback classifier.
    pub endpoint: Option<String>,
    /// Default model selector forwarded with every request.
    pub model: Option<String>,
    #[serde(default = "default_timeout_s")]
    pub timeout_s: u64,
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,
}

fn default_timeout_s() -> u64 { 30 }
fn default_fallback_delay_ms() -> u64 { 1000 }

impl Default for DetectConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: None,
            timeout_s: default_timeout_s(),
            fallback_delay_ms: default_fallback_delay_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_scores() -> Vec<EmotionScore> {
        Emotion::ALL
            .iter()
            .map(|&emotion| EmotionScore { emotion, confidence: 1.0 / 7.0 })
            .collect()
    }

    #[test]
    fn from_scores_sorts_and_derives_primary() {
        let mut scores = uniform_scores();
        scores[3].confidence = 0.85; // Surprised
        scores[1].confidence = 0.05;
        let result = DetectionResult::from_scores(scores).unwrap();
        assert_eq!(result.primary_emotion, Emotion::Surprised);
        assert!((result.confidence - 85.0).abs() < 0.01);
        assert_eq!(result.all_results[0].emotion, Emotion::Surprised);
        result.validate().unwrap();
    }

    #[test]
    fn validate_rejects_missing_category() {
        let mut scores = uniform_scores();
        scores.pop();
        assert!(matches!(
            DetectionResult::from_scores(scores),
            Err(DetectError::Response(_))
        ));
    }

    #[test]
    fn validate_rejects_duplicate_category() {
        let mut scores = uniform_scores();
        scores[6].emotion = Emotion::Happy;
        assert!(matches!(
            DetectionResult::from_scores(scores),
            Err(DetectError::Response(_))
        ));
    }

    #[test]
    fn validate_rejects_mismatched_primary() {
        let result = DetectionResult {
            primary_emotion: Emotion::Sad,
            confidence: 90.0,
            all_results: {
                let mut scores = uniform_scores();
                scores[0].confidence = 0.9;
                scores
            },
        };
        assert!(result.validate().is_err());
    }

    #[test]
    fn wire_shape_uses_camel_case() {
        let result = DetectionResult::from_scores(uniform_scores()).unwrap();
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"primaryEmotion\""));
        assert!(json.contains("\"allResults\""));
    }

    #[test]
    fn wire_parse_accepts_model_label_aliases() {
        let json = r#"{
            "primaryEmotion": "Surprise",
            "confidence": 64.0,
            "allResults": [
                {"emotion": "Surprise", "confidence": 0.64},
                {"emotion": "Fear", "confidence": 0.12},
                {"emotion": "Disgust", "confidence": 0.08},
                {"emotion": "Anger", "confidence": 0.06},
                {"emotion": "Happiness", "confidence": 0.05},
                {"emotion": "Sadness", "confidence": 0.03},
                {"emotion": "Neutral", "confidence": 0.02}
            ]
        }"#;
        let result: DetectionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.primary_emotion, Emotion::Surprised);
        result.validate().unwrap();
        // Canonical names on the way back out.
        let out = serde_json::to_string(&result).unwrap();
        assert!(out.contains("\"Surprised\""));
        assert!(!out.contains("\"Surprise\","));
    }

    #[test]
    fn detect_config_defaults() {
        let cfg: DetectConfig = toml_like_default();
        assert_eq!(cfg.timeout_s, 30);
        assert_eq!(cfg.fallback_delay_ms, 1000);
        assert!(cfg.endpoint.is_none());
    }

    fn toml_like_default() -> DetectConfig {
        serde_json::from_str("{}").unwrap()
    }
}
