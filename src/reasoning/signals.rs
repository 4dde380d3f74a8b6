//! Learner signals supplied by external analyzers.
//!
//! The core never estimates emotion or cognitive state itself. It receives
//! three scores in [0, 1] and, optionally, the primary emotion label, and
//! only normalizes their ranges.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Neutral value substituted for non-numeric signals.
const NEUTRAL_SIGNAL: f64 = 0.5;

/// Primary emotion label reported by the emotion analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Confused,
    Frustrated,
    Anxious,
    Overwhelmed,
    Bored,
    Neutral,
    Curious,
    Interested,
    Engaged,
    Excited,
    Confident,
    Satisfied,
}

impl Emotion {
    /// Get the label as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Confused => "confused",
            Emotion::Frustrated => "frustrated",
            Emotion::Anxious => "anxious",
            Emotion::Overwhelmed => "overwhelmed",
            Emotion::Bored => "bored",
            Emotion::Neutral => "neutral",
            Emotion::Curious => "curious",
            Emotion::Interested => "interested",
            Emotion::Engaged => "engaged",
            Emotion::Excited => "excited",
            Emotion::Confident => "confident",
            Emotion::Satisfied => "satisfied",
        }
    }

    /// How confident a learner in this state is, 0 (struggling) to 1.
    pub fn confidence_score(&self) -> f64 {
        match self {
            Emotion::Overwhelmed => 0.1,
            Emotion::Confused => 0.2,
            Emotion::Frustrated | Emotion::Anxious => 0.3,
            Emotion::Bored | Emotion::Neutral => 0.5,
            Emotion::Curious | Emotion::Interested => 0.6,
            Emotion::Engaged | Emotion::Excited => 0.8,
            Emotion::Confident | Emotion::Satisfied => 0.9,
        }
    }

    /// Budget multiplier for this state.
    ///
    /// Struggling states ask for more detail, except `Overwhelmed`, which
    /// needs less. Confident and bored learners get more concise output.
    pub fn budget_multiplier(&self) -> f64 {
        match self {
            Emotion::Confused => 1.5,
            Emotion::Frustrated => 1.4,
            Emotion::Anxious => 1.3,
            Emotion::Curious => 1.2,
            Emotion::Excited => 1.1,
            Emotion::Neutral | Emotion::Interested | Emotion::Engaged => 1.0,
            Emotion::Confident | Emotion::Satisfied => 0.9,
            Emotion::Bored => 0.8,
            Emotion::Overwhelmed => 0.6,
        }
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "confused" => Ok(Emotion::Confused),
            "frustrated" => Ok(Emotion::Frustrated),
            "anxious" => Ok(Emotion::Anxious),
            "overwhelmed" => Ok(Emotion::Overwhelmed),
            "bored" => Ok(Emotion::Bored),
            "neutral" => Ok(Emotion::Neutral),
            "curious" => Ok(Emotion::Curious),
            "interested" => Ok(Emotion::Interested),
            "engaged" => Ok(Emotion::Engaged),
            "excited" => Ok(Emotion::Excited),
            "confident" => Ok(Emotion::Confident),
            "satisfied" => Ok(Emotion::Satisfied),
            _ => Err(format!("Unknown emotion: {}", s)),
        }
    }
}

/// Discrete learning-readiness levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningReadiness {
    Optimal,
    High,
    Moderate,
    Low,
    NotReady,
}

impl LearningReadiness {
    /// Numeric readiness score in [0, 1].
    pub fn score(&self) -> f64 {
        match self {
            LearningReadiness::Optimal => 1.0,
            LearningReadiness::High => 0.8,
            LearningReadiness::Moderate => 0.5,
            LearningReadiness::Low => 0.3,
            LearningReadiness::NotReady => 0.1,
        }
    }
}

impl std::str::FromStr for LearningReadiness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "optimal" => Ok(LearningReadiness::Optimal),
            "high" => Ok(LearningReadiness::High),
            "moderate" => Ok(LearningReadiness::Moderate),
            "low" => Ok(LearningReadiness::Low),
            "not_ready" | "not-ready" => Ok(LearningReadiness::NotReady),
            _ => Err(format!("Unknown readiness level: {}", s)),
        }
    }
}

/// Emotional state of the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionState {
    /// 0 = struggling, 1 = very confident
    pub emotion_factor: f64,
    /// Primary emotion label, when the analyzer provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_emotion: Option<Emotion>,
}

impl EmotionState {
    /// Create from a raw emotion factor.
    pub fn new(emotion_factor: f64) -> Self {
        Self {
            emotion_factor,
            primary_emotion: None,
        }
    }

    /// Derive the factor from a label and a valence in [-1, 1].
    ///
    /// factor = 0.7 * label confidence + 0.3 * valence mapped to [0, 1]
    pub fn from_emotion(emotion: Emotion, valence: f64) -> Self {
        let valence = if valence.is_finite() {
            valence.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        let factor = emotion.confidence_score() * 0.7 + (valence + 1.0) / 2.0 * 0.3;
        Self {
            emotion_factor: factor,
            primary_emotion: Some(emotion),
        }
    }

    /// Attach the primary emotion label.
    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.primary_emotion = Some(emotion);
        self
    }
}

impl Default for EmotionState {
    fn default() -> Self {
        Self::new(NEUTRAL_SIGNAL)
    }
}

/// Cognitive state of the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CognitiveState {
    /// 0 = unloaded, 1 = fully loaded
    pub cognitive_load: f64,
    /// 0 = not ready, 1 = ready to absorb detail
    pub readiness: f64,
}

impl CognitiveState {
    /// Create from raw scores.
    pub fn new(cognitive_load: f64, readiness: f64) -> Self {
        Self {
            cognitive_load,
            readiness,
        }
    }

    /// Create from a discrete readiness level.
    pub fn with_readiness_level(cognitive_load: f64, level: LearningReadiness) -> Self {
        Self::new(cognitive_load, level.score())
    }
}

impl Default for CognitiveState {
    fn default() -> Self {
        Self::new(NEUTRAL_SIGNAL, NEUTRAL_SIGNAL)
    }
}

/// The three numeric signals consumed by the decision and budget stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    pub emotion_factor: f64,
    pub cognitive_load: f64,
    pub readiness: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_emotion: Option<Emotion>,
}

/// A correction applied while normalizing a signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalCorrection {
    /// Signal name
    pub field: String,
    /// Value as supplied; `None` when it was NaN or infinite
    pub original: Option<f64>,
    /// Value used instead
    pub corrected: f64,
}

impl SignalSet {
    /// Create from raw scores.
    pub fn new(emotion_factor: f64, cognitive_load: f64, readiness: f64) -> Self {
        Self {
            emotion_factor,
            cognitive_load,
            readiness,
            primary_emotion: None,
        }
    }

    /// Combine the emotion and cognitive states.
    pub fn from_states(emotion: &EmotionState, cognitive: &CognitiveState) -> Self {
        Self {
            emotion_factor: emotion.emotion_factor,
            cognitive_load: cognitive.cognitive_load,
            readiness: cognitive.readiness,
            primary_emotion: emotion.primary_emotion,
        }
    }

    /// Attach the primary emotion label.
    pub fn with_emotion(mut self, emotion: Emotion) -> Self {
        self.primary_emotion = Some(emotion);
        self
    }

    /// Clamp every signal into [0, 1], replacing NaN with 0.5.
    ///
    /// Returns the normalized set and the corrections made; each correction
    /// is logged.
    pub fn sanitized(&self) -> (Self, Vec<SignalCorrection>) {
        let mut corrections = Vec::new();
        let mut fix = |field: &str, value: f64| -> f64 {
            let corrected = if value.is_nan() {
                NEUTRAL_SIGNAL
            } else {
                value.clamp(0.0, 1.0)
            };
            if value.is_nan() || corrected != value {
                warn!(
                    field = field,
                    original = value,
                    corrected = corrected,
                    "Signal outside [0, 1], clamped"
                );
                corrections.push(SignalCorrection {
                    field: field.to_string(),
                    original: value.is_finite().then_some(value),
                    corrected,
                });
            }
            corrected
        };

        let sanitized = Self {
            emotion_factor: fix("emotion_factor", self.emotion_factor),
            cognitive_load: fix("cognitive_load", self.cognitive_load),
            readiness: fix("readiness", self.readiness),
            primary_emotion: self.primary_emotion,
        };
        (sanitized, corrections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emotion_round_trip_names() {
        for emotion in [
            Emotion::Confused,
            Emotion::Overwhelmed,
            Emotion::Confident,
            Emotion::Satisfied,
        ] {
            assert_eq!(emotion.as_str().parse::<Emotion>().unwrap(), emotion);
        }
        assert!("ecstatic".parse::<Emotion>().is_err());
    }

    #[test]
    fn test_emotion_confidence_ordering() {
        assert!(Emotion::Confident.confidence_score() > Emotion::Neutral.confidence_score());
        assert!(Emotion::Neutral.confidence_score() > Emotion::Confused.confidence_score());
    }

    #[test]
    fn test_emotion_budget_multiplier_range() {
        for emotion in [
            Emotion::Confused,
            Emotion::Frustrated,
            Emotion::Anxious,
            Emotion::Overwhelmed,
            Emotion::Bored,
            Emotion::Confident,
        ] {
            let m = emotion.budget_multiplier();
            assert!((0.5..=2.0).contains(&m));
        }
        assert!(Emotion::Confused.budget_multiplier() > Emotion::Confident.budget_multiplier());
        assert!(Emotion::Overwhelmed.budget_multiplier() < Emotion::Neutral.budget_multiplier());
    }

    #[test]
    fn test_from_emotion_blends_valence() {
        let state = EmotionState::from_emotion(Emotion::Confident, 1.0);
        assert!((state.emotion_factor - (0.9 * 0.7 + 0.3)).abs() < 1e-9);
        assert_eq!(state.primary_emotion, Some(Emotion::Confident));

        let state = EmotionState::from_emotion(Emotion::Confused, -1.0);
        assert!((state.emotion_factor - 0.14).abs() < 1e-9);
    }

    #[test]
    fn test_from_emotion_clamps_valence() {
        let a = EmotionState::from_emotion(Emotion::Neutral, 5.0);
        let b = EmotionState::from_emotion(Emotion::Neutral, 1.0);
        assert_eq!(a.emotion_factor, b.emotion_factor);
    }

    #[test]
    fn test_readiness_levels() {
        assert_eq!(LearningReadiness::Optimal.score(), 1.0);
        assert_eq!(LearningReadiness::Low.score(), 0.3);
        assert_eq!(LearningReadiness::NotReady.score(), 0.1);
        assert_eq!(
            "not_ready".parse::<LearningReadiness>().unwrap(),
            LearningReadiness::NotReady
        );
        let state = CognitiveState::with_readiness_level(0.2, LearningReadiness::High);
        assert_eq!(state.readiness, 0.8);
    }

    #[test]
    fn test_sanitized_passes_valid_signals() {
        let signals = SignalSet::new(0.9, 0.2, 1.0);
        let (clean, corrections) = signals.sanitized();
        assert_eq!(clean, signals);
        assert!(corrections.is_empty());
    }

    #[test]
    fn test_sanitized_clamps_and_replaces_nan() {
        let signals = SignalSet::new(1.7, f64::NAN, -0.3);
        let (clean, corrections) = signals.sanitized();
        assert_eq!(clean.emotion_factor, 1.0);
        assert_eq!(clean.cognitive_load, 0.5);
        assert_eq!(clean.readiness, 0.0);
        assert_eq!(corrections.len(), 3);
        assert_eq!(corrections[1].field, "cognitive_load");
        assert_eq!(corrections[0].original, Some(1.7));
        assert_eq!(corrections[1].original, None);
    }

    #[test]
    fn test_non_finite_correction_round_trips_through_json() {
        let signals = SignalSet::new(f64::NAN, f64::INFINITY, 0.5);
        let (_, corrections) = signals.sanitized();

        let json = serde_json::to_string(&corrections).unwrap();
        let back: Vec<SignalCorrection> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, corrections);
        assert_eq!(back[0].original, None);
        assert_eq!(back[1].original, None);
        assert_eq!(back[1].corrected, 1.0);
    }

    #[test]
    fn test_from_states_keeps_label() {
        let emotion = EmotionState::new(0.4).with_emotion(Emotion::Anxious);
        let cognitive = CognitiveState::new(0.6, 0.7);
        let signals = SignalSet::from_states(&emotion, &cognitive);
        assert_eq!(signals.emotion_factor, 0.4);
        assert_eq!(signals.cognitive_load, 0.6);
        assert_eq!(signals.readiness, 0.7);
        assert_eq!(signals.primary_emotion, Some(Emotion::Anxious));
    }
}
