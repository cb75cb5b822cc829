//! Combined-score composition and verdict mapping

use serde::{Deserialize, Serialize};

/// Graded assessment of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    LikelyHuman,
    LowSuspicion,
    Suspicious,
    ProbableAgent,
    HighConfidenceAgent,
}

impl Verdict {
    /// Map a combined score onto its verdict band
    pub fn from_score(score: u32) -> Self {
        match score {
            80..=u32::MAX => Verdict::HighConfidenceAgent,
            60..=79 => Verdict::ProbableAgent,
            40..=59 => Verdict::Suspicious,
            20..=39 => Verdict::LowSuspicion,
            _ => Verdict::LikelyHuman,
        }
    }
}

/// Compose the four sub-scores into the combined score
///
/// Interaction evidence is the base; injection and fingerprint evidence add
/// stepped bonuses; strong agent evidence floors the result at 80.
pub fn combined_score(interaction: u32, injection: u32, fingerprint: u32, agent: u32) -> u32 {
    let mut score = interaction;

    score += match injection {
        50.. => 25,
        25..=49 => 15,
        10..=24 => 5,
        _ => 0,
    };

    score += match fingerprint {
        70.. => 30,
        40..=69 => 15,
        20..=39 => 5,
        _ => 0,
    };

    if agent >= 70 {
        score = score.max(80) + 10;
    } else if agent >= 40 {
        score += 15;
    } else if agent >= 20 {
        score += 5;
    }

    score.min(100)
}
