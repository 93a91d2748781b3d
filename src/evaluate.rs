use log::info;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::DetectionOptions;
use crate::detection::BubbleDetector;
use crate::errors::EvaluationError;
use crate::image::PixelBuffer;
use crate::resolve::{resolve_answers, DiagnosticKind};
use crate::scoring::{GradedResult, ScannedSheet};
use crate::state::{AnswerKey, Submission};

/// A graded sheet together with anything the caller should double check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub result: GradedResult,
    pub warnings: Vec<DiagnosticKind>,
}

impl Evaluation {
    pub fn is_low_confidence(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, DiagnosticKind::LowConfidenceDetection { .. }))
    }
}

/// Reads the marked answers off `image` without grading them.
pub fn read_answers(
    key: &AnswerKey,
    image: &PixelBuffer,
    submission: Submission,
    options: &DetectionOptions,
) -> Result<(ScannedSheet, Vec<DiagnosticKind>), EvaluationError> {
    options.validate()?;
    key.validate()?;
    image.validate()?;

    let regions = BubbleDetector::new(options).detect(image, key.total_questions);
    let resolution = resolve_answers(&regions, key.total_questions, options);
    Ok((
        ScannedSheet {
            submission,
            answers: resolution.answers,
        },
        resolution.warnings,
    ))
}

/// Detects, resolves and grades one sheet. Invalid keys and images are
/// rejected before any scanning happens.
pub fn evaluate_sheet(
    key: &AnswerKey,
    image: &PixelBuffer,
    submission: Submission,
    options: &DetectionOptions,
) -> Result<Evaluation, EvaluationError> {
    let (sheet, warnings) = read_answers(key, image, submission, options)?;
    let result = sheet.score(key)?;
    info!(
        "Graded {} for exam {}: {}/{} ({}%), {} of {} answered",
        result.student_id,
        result.exam_id,
        result.total_score,
        result.max_marks,
        result.percentage,
        result.detection_stats.questions_answered,
        result.detection_stats.total_questions
    );
    Ok(Evaluation { result, warnings })
}

/// Grades many sheets against one key in parallel. Results keep the input order.
pub fn evaluate_batch(
    key: &AnswerKey,
    sheets: Vec<(Submission, PixelBuffer)>,
    options: &DetectionOptions,
) -> Vec<Result<Evaluation, EvaluationError>> {
    sheets
        .into_par_iter()
        .map(|(submission, image)| evaluate_sheet(key, &image, submission, options))
        .collect()
}

#[cfg(test)]
mod unit_tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::errors::{AnswerKeyError, BufferError, ConfigError};
    use crate::state::{Answer, ResolvedAnswers, Subject};
    use crate::test_utils::*;

    fn key_60() -> AnswerKey {
        AnswerKey {
            id: "mock-60".to_owned(),
            exam_name: "Mock 60".to_owned(),
            total_questions: 60,
            subjects: vec![
                Subject {
                    name: "Mathematics".to_owned(),
                    question_range: (1, 20),
                    max_marks: 40.0,
                },
                Subject {
                    name: "Physics".to_owned(),
                    question_range: (21, 40),
                    max_marks: 40.0,
                },
                Subject {
                    name: "Chemistry".to_owned(),
                    question_range: (41, 60),
                    max_marks: 20.0,
                },
            ],
            answers: (1..=60).map(|q| (q, Answer::ALL[(q % 4) as usize])).collect(),
        }
    }

    fn submission() -> Submission {
        Submission::at(
            "STU042",
            "Sam Lee",
            Utc.with_ymd_and_hms(2024, 5, 2, 14, 0, 0).unwrap(),
        )
    }

    fn evaluate(key: &AnswerKey, image: &PixelBuffer) -> Evaluation {
        evaluate_sheet(key, image, submission(), &DetectionOptions::default()).unwrap()
    }

    #[test]
    fn test_blank_sheet() {
        let eval = evaluate(&key_60(), &blank_sheet());
        assert!(eval.result.answers.is_empty());
        assert_eq!(eval.result.total_score, 0.0);
        assert_eq!(eval.result.detection_stats.questions_answered, 0);
        assert_eq!(eval.result.detection_stats.questions_blank, 60);
        assert!(eval.is_low_confidence());
    }

    #[test]
    fn test_marked_sheet_is_graded() {
        let key = key_60();
        // ten right answers in Mathematics, two wrong ones in Physics
        let mut marks: Vec<(u32, Answer)> = (1..=10).map(|q| (q, key.answers[&q])).collect();
        marks.push((21, Answer::A));
        marks.push((22, Answer::A));
        let eval = evaluate(&key, &sheet_with_marks(&marks));

        let expected: ResolvedAnswers = marks.iter().copied().collect();
        assert_eq!(eval.result.answers, expected);
        assert_eq!(eval.result.scores["Mathematics"], 20.0);
        assert_eq!(eval.result.scores["Physics"], 0.0);
        assert_eq!(eval.result.total_score, 20.0);
        assert_eq!(eval.result.percentage, 20.0);
        assert_eq!(eval.result.detection_stats.correct_answers, 10);
        assert_eq!(eval.result.detection_stats.wrong_answers, 2);
        assert_eq!(eval.result.detection_stats.questions_blank, 48);
        assert!(eval.warnings.is_empty());
    }

    #[test]
    fn test_darker_of_two_marks_wins() {
        let key = key_60();
        let mut sheet = blank_sheet();
        mark(&mut sheet, 7, Answer::A, 105);
        mark(&mut sheet, 7, Answer::C, 0);
        let eval = evaluate(&key, &sheet);
        assert_eq!(eval.result.answers, BTreeMap::from([(7, Answer::C)]));
    }

    #[test]
    fn test_faint_mark_is_blank() {
        let mut sheet = blank_sheet();
        // darkness 105: admitted by the scan, too weak to be committed to
        mark(&mut sheet, 12, Answer::B, 150);
        let eval = evaluate(&key_60(), &sheet);
        assert!(eval.result.answers.is_empty());
    }

    #[test]
    fn test_small_exam_drops_cells_past_total() {
        let mut key = key_60();
        key.total_questions = 10;
        key.subjects.truncate(1);
        key.subjects[0].question_range = (1, 10);
        let eval = evaluate(&key, &sheet_with_marks(&[(2, Answer::B), (30, Answer::A)]));
        assert_eq!(eval.result.answers, BTreeMap::from([(2, Answer::B)]));
        assert_eq!(eval.result.detection_stats.questions_blank, 9);
    }

    #[test]
    fn test_repeatable() {
        let key = key_60();
        let sheet = sheet_with_marks(&[(1, Answer::B), (33, Answer::D), (60, Answer::A)]);
        let first = evaluate(&key, &sheet);
        let second = evaluate(&key, &sheet);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_invalid_key_rejected() {
        let mut key = key_60();
        for subject in &mut key.subjects {
            subject.max_marks = 0.0;
        }
        let result = evaluate_sheet(&key, &blank_sheet(), submission(), &Default::default());
        assert!(matches!(
            result,
            Err(EvaluationError::InvalidAnswerKey(AnswerKeyError::ZeroMaxMarks))
        ));
    }

    #[test]
    fn test_invalid_options_rejected() {
        let options = DetectionOptions {
            scan_step: 0,
            ..Default::default()
        };
        let result = evaluate_sheet(&key_60(), &blank_sheet(), submission(), &options);
        assert!(matches!(
            result,
            Err(EvaluationError::InvalidOptions(ConfigError::Invalid(_)))
        ));
    }

    #[test]
    fn test_zero_sized_image_rejected() {
        let err = PixelBuffer::filled(0, 480, [255; 4]).unwrap_err();
        assert!(matches!(err, BufferError::ZeroDimension { .. }));
        assert!(matches!(
            EvaluationError::from(err),
            EvaluationError::InvalidPixelBuffer(_)
        ));
    }

    #[test]
    fn test_batch_keeps_order() {
        let key = key_60();
        let sheets = vec![
            (
                Submission::at("A1", "First", submission().timestamp),
                sheet_with_marks(&[(1, key.answers[&1])]),
            ),
            (
                Submission::at("A2", "Second", submission().timestamp),
                blank_sheet(),
            ),
            (
                Submission::at("A3", "Third", submission().timestamp),
                sheet_with_marks(&[(1, key.answers[&1]), (2, key.answers[&2])]),
            ),
        ];
        let results = evaluate_batch(&key, sheets, &DetectionOptions::default());
        let ids: Vec<_> = results
            .iter()
            .map(|r| r.as_ref().unwrap().result.student_id.as_str())
            .collect();
        assert_eq!(ids, vec!["A1", "A2", "A3"]);
        assert_eq!(results[0].as_ref().unwrap().result.total_score, 2.0);
        assert_eq!(results[2].as_ref().unwrap().result.total_score, 4.0);
    }
}
