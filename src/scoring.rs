use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::AnswerKeyError;
use crate::state::{Answer, AnswerKey, ResolvedAnswers, Submission};

/// Percentage needed for anything but an F.
pub const PASS_PERCENTAGE: f64 = 40.0;

/// Rounds half up to 2 decimal places, `floor(x * 100 + 0.5) / 100`.
pub fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckedAnswer {
    Correct,
    /// Answered, but not the key's option. Also any answer to a question without a key.
    Incorrect,
    /// Left blank.
    Missing,
}

impl Answer {
    pub fn check_with(curr: Option<Answer>, key: Option<Answer>) -> CheckedAnswer {
        match (curr, key) {
            (Some(curr), Some(key)) if curr == key => CheckedAnswer::Correct,
            (Some(_), _) => CheckedAnswer::Incorrect,
            (None, _) => CheckedAnswer::Missing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionReview {
    pub question: u32,
    pub given: Option<Answer>,
    pub expected: Option<Answer>,
    pub status: CheckedAnswer,
}

/// returns: (correct, incorrect, missing)
fn collect_stats(checked: impl IntoIterator<Item = CheckedAnswer>) -> (u32, u32, u32) {
    let (mut correct, mut incorrect, mut missing) = (0u32, 0u32, 0u32);
    for ans in checked {
        match ans {
            CheckedAnswer::Correct => correct += 1,
            CheckedAnswer::Incorrect => incorrect += 1,
            CheckedAnswer::Missing => missing += 1,
        }
    }
    (correct, incorrect, missing)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionStats {
    pub total_questions: u32,
    pub questions_answered: u32,
    pub questions_blank: u32,
    pub correct_answers: u32,
    pub wrong_answers: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectStats {
    pub answered: u32,
    pub correct: u32,
    pub total: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_percentage(percentage: f64) -> Grade {
        match percentage {
            p if p >= 90.0 => Grade::APlus,
            p if p >= 80.0 => Grade::A,
            p if p >= 70.0 => Grade::BPlus,
            p if p >= 60.0 => Grade::B,
            p if p >= 50.0 => Grade::C,
            p if p >= PASS_PERCENTAGE => Grade::D,
            _ => Grade::F,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }

    pub fn is_pass(self) -> bool {
        self != Grade::F
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The graded record handed to a result sink.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradedResult {
    pub student_id: String,
    pub student_name: String,
    pub exam_id: String,
    pub timestamp: DateTime<Utc>,
    pub answers: ResolvedAnswers,
    /// Subject name -> earned marks, rounded to 2 places.
    pub scores: BTreeMap<String, f64>,
    pub subject_stats: BTreeMap<String, SubjectStats>,
    pub total_score: f64,
    pub max_marks: f64,
    pub percentage: f64,
    pub detection_stats: DetectionStats,
}

impl GradedResult {
    pub fn grade(&self) -> Grade {
        Grade::from_percentage(self.percentage)
    }

    /// Per-question outcome for every question of `key`.
    pub fn review(&self, key: &AnswerKey) -> Vec<QuestionReview> {
        review_answers(&self.answers, key)
    }
}

fn review_answers(answers: &ResolvedAnswers, key: &AnswerKey) -> Vec<QuestionReview> {
    (1..=key.total_questions)
        .map(|question| {
            let given = answers.get(&question).copied();
            let expected = key.correct_answer(question);
            QuestionReview {
                question,
                given,
                expected,
                status: Answer::check_with(given, expected),
            }
        })
        .collect()
}

/// Answers read off one sheet, ready to be graded.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedSheet {
    pub submission: Submission,
    pub answers: ResolvedAnswers,
}

impl ScannedSheet {
    pub fn score(&self, key: &AnswerKey) -> Result<GradedResult, AnswerKeyError> {
        key.validate()?;

        let mut scores = BTreeMap::new();
        let mut subject_stats = BTreeMap::new();
        let mut total_score = 0.0;
        for subject in &key.subjects {
            let marks_per_question = subject.marks_per_question();
            let checked: Vec<CheckedAnswer> = subject
                .questions()
                .map(|q| Answer::check_with(self.answers.get(&q).copied(), key.correct_answer(q)))
                .collect();
            let (correct, incorrect, _) = collect_stats(checked.iter().copied());

            let earned: f64 = checked
                .iter()
                .filter(|&&c| c == CheckedAnswer::Correct)
                .map(|_| marks_per_question)
                .sum();
            let subject_score = round2(earned);

            total_score += subject_score;
            scores.insert(subject.name.clone(), subject_score);
            subject_stats.insert(
                subject.name.clone(),
                SubjectStats {
                    answered: correct + incorrect,
                    correct,
                    total: subject.question_count(),
                },
            );
        }
        let total_score = round2(total_score);
        let max_marks = key.max_marks();

        let review = review_answers(&self.answers, key);
        let (correct, incorrect, missing) = collect_stats(review.iter().map(|r| r.status));
        let detection_stats = DetectionStats {
            total_questions: key.total_questions,
            questions_answered: correct + incorrect,
            questions_blank: missing,
            correct_answers: correct,
            wrong_answers: incorrect,
        };

        Ok(GradedResult {
            student_id: self.submission.student_id.clone(),
            student_name: self.submission.student_name.clone(),
            exam_id: key.id.clone(),
            timestamp: self.submission.timestamp,
            answers: self.answers.clone(),
            scores,
            subject_stats,
            total_score,
            max_marks,
            percentage: round2(total_score / max_marks * 100.0),
            detection_stats,
        })
    }
}
