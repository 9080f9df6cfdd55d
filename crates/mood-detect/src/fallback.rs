use std::time::Duration;

use rand::Rng;
use tracing::warn;

use mood_capture::EncodedFrame;

use crate::{DetectError, DetectionResult, Emotion, EmotionScore};

/// Synthesizes results when no remote service could be resolved.
///
/// Output is a valid probability distribution over the category set, but it
/// is a placeholder: every result is logged as non-authoritative. The
/// artificial delay keeps caller loading states honest.
pub struct FallbackClassifier {
    delay: Duration,
}

impl FallbackClassifier {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// One independent weight per category, normalized to sum 1.
    pub fn synthesize(&self) -> Result<DetectionResult, DetectError> {
        let mut rng = rand::thread_rng();
        let mut weights: Vec<f32> = Emotion::ALL.iter().map(|_| rng.gen::<f32>()).collect();
        let sum: f32 = weights.iter().sum();
        if sum <= f32::EPSILON {
            weights.fill(1.0);
        }
        let sum: f32 = weights.iter().sum();

        let scores = Emotion::ALL
            .iter()
            .zip(&weights)
            .map(|(&emotion, &w)| EmotionScore { emotion, confidence: w / sum })
            .collect();
        DetectionResult::from_scores(scores)
    }

    /// The frame and model selector are ignored; there is no model here.
    pub async fn classify(
        &self,
        _frame: &EncodedFrame,
        _model: Option<&str>,
    ) -> Result<DetectionResult, DetectError> {
        tokio::time::sleep(self.delay).await;
        let result = self.synthesize()?;
        warn!(
            "fallback: synthesized {} ({:.1}%) - placeholder, not model output",
            result.primary_emotion, result.confidence
        );
        Ok(result)
    }
}

impl Default for FallbackClassifier {
    fn default() -> Self {
        Self::new(Duration::from_millis(1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesized_results_are_normalized_distributions() {
        let fallback = FallbackClassifier::default();
        for _ in 0..50 {
            let result = fallback.synthesize().unwrap();
            result.validate().unwrap();

            let sum: f32 = result.all_results.iter().map(|s| s.confidence).sum();
            assert!((sum - 1.0).abs() < 1e-4, "sum was {sum}");
            assert_eq!(result.primary_emotion, result.all_results[0].emotion);
            assert!(
                (result.confidence - result.all_results[0].confidence * 100.0).abs() < 0.01
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn classify_applies_artificial_delay() {
        let fallback = FallbackClassifier::new(Duration::from_millis(250));
        let frame = EncodedFrame { data: vec![0], width: 1, height: 1 };
        let started = tokio::time::Instant::now();
        fallback.classify(&frame, None).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
