use std::fmt;

use serde::Serialize;

use crate::{render::Color, results::ResultsDocument};

/// Score below which an extended moment counts as a problem.
pub const DEFAULT_PROBLEM_THRESHOLD: f64 = 70.0;

/// Coarse rating of the overall similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreBand {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 85.0 {
            ScoreBand::Excellent
        } else if score >= 70.0 {
            ScoreBand::Good
        } else if score >= 50.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScoreBand::Excellent => "excellent",
            ScoreBand::Good => "good",
            ScoreBand::Fair => "fair",
            ScoreBand::Poor => "poor",
        };
        f.write_str(label)
    }
}

/// Heat-map colour of a segment score on the performance timeline.
pub fn heat_color(score: f64) -> Color {
    if score >= 80.0 {
        Color(0x4ade80)
    } else if score >= 60.0 {
        Color(0xa3e635)
    } else if score >= 40.0 {
        Color(0xfacc15)
    } else if score >= 20.0 {
        Color(0xfb923c)
    } else {
        Color(0xf87171)
    }
}

/// A low-scoring joint with the reference time to jump to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemMoment {
    pub joint: String,
    pub score: f64,
    pub ref_frame: usize,
    pub seek_time: f64,
}

/// Extended moments scoring below `threshold`, in document order. Moments
/// without a frame cannot be seeked to and are left out.
pub fn problem_moments(document: &ResultsDocument, threshold: f64) -> Vec<ProblemMoment> {
    moments_with_time(document, document.extended_moments.iter().filter(|m| m.score < threshold))
}

/// The scorer's global worst moments, with seek times.
pub fn worst_moments(document: &ResultsDocument) -> Vec<ProblemMoment> {
    moments_with_time(document, document.worst_moments.iter())
}

fn moments_with_time<'a>(
    document: &ResultsDocument,
    moments: impl Iterator<Item = &'a crate::results::Moment>,
) -> Vec<ProblemMoment> {
    moments
        .filter_map(|moment| {
            let ref_frame = moment.ref_frame?;
            Some(ProblemMoment {
                joint: moment.joint.clone(),
                score: moment.score,
                ref_frame,
                seek_time: ref_frame as f64 / document.ref_fps,
            })
        })
        .collect()
}
