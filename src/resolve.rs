use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::config::DetectionOptions;
use crate::detection::MarkedRegion;
use crate::state::ResolvedAnswers;

/// Non-fatal findings reported next to a graded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(
    rename_all = "camelCase",
    rename_all_fields = "camelCase",
    tag = "kind"
)]
pub enum DiagnosticKind {
    /// Too few questions resolved for the detection to be trusted; the sheet may need a rescan.
    LowConfidenceDetection { resolved: u32, total_questions: u32 },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Resolution {
    pub answers: ResolvedAnswers,
    pub warnings: Vec<DiagnosticKind>,
}

/// Darkest region of a group. Equal darkness keeps the earlier region.
fn darkest<'a>(group: impl Iterator<Item = &'a MarkedRegion>) -> Option<&'a MarkedRegion> {
    group.reduce(|best, region| {
        if region.darkness > best.darkness {
            region
        } else {
            best
        }
    })
}

/// Collapses candidate regions into at most one option per question.
///
/// `regions` must be in scan order for ties to resolve the same way on every run.
pub fn resolve_answers(
    regions: &[MarkedRegion],
    total_questions: u32,
    options: &DetectionOptions,
) -> Resolution {
    let strict = options.strict_darkness();
    let mut answers = ResolvedAnswers::new();

    let by_question = regions
        .iter()
        .sorted_by_key(|r| r.question)
        .chunk_by(|r| r.question);
    for (question, group) in &by_question {
        match darkest(group) {
            Some(best) if best.darkness > strict => {
                answers.insert(question, best.option);
            }
            Some(best) => debug!(
                "Q{question}: best mark {} at ({}, {}) is below {strict}",
                best.option, best.x, best.y
            ),
            None => (),
        }
    }

    let mut warnings = vec![];
    let resolved = answers.len() as u32;
    if f64::from(resolved) < f64::from(total_questions) * options.low_detection_warning_fraction {
        warn!(
            "Very few marked bubbles detected ({resolved} of {total_questions}). Check image quality and bubble marking."
        );
        warnings.push(DiagnosticKind::LowConfidenceDetection {
            resolved,
            total_questions,
        });
    }

    Resolution { answers, warnings }
}
