use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::AnswerKeyError;

/// One of the four printed options of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Answer {
    A,
    B,
    C,
    D,
}

impl Answer {
    pub const ALL: [Answer; 4] = [Answer::A, Answer::B, Answer::C, Answer::D];

    /// Option at `idx` in sheet order, `None` past the fourth column.
    pub fn from_index(idx: usize) -> Option<Answer> {
        Self::ALL.get(idx).copied()
    }

    pub fn index(self) -> usize {
        match self {
            Answer::A => 0,
            Answer::B => 1,
            Answer::C => 2,
            Answer::D => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Answer::A => "A",
            Answer::B => "B",
            Answer::C => "C",
            Answer::D => "D",
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Question number -> the single option committed to for it. Blank questions are absent.
pub type ResolvedAnswers = BTreeMap<u32, Answer>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub name: String,
    /// Inclusive `[start, end]`.
    pub question_range: (u32, u32),
    pub max_marks: f64,
}

impl Subject {
    pub fn questions(&self) -> RangeInclusive<u32> {
        self.question_range.0..=self.question_range.1
    }

    pub fn question_count(&self) -> u32 {
        self.question_range.1 - self.question_range.0 + 1
    }

    /// Marks are spread evenly over the range.
    pub fn marks_per_question(&self) -> f64 {
        let (start, end) = self.question_range;
        self.max_marks / (f64::from(end - start) + 1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerKey {
    pub id: String,
    #[serde(default)]
    pub exam_name: String,
    pub total_questions: u32,
    pub subjects: Vec<Subject>,
    /// Correct option per question. A missing entry makes the question unwinnable.
    #[serde(default)]
    pub answers: BTreeMap<u32, Answer>,
}

impl AnswerKey {
    pub fn from_json(json: &str) -> Result<AnswerKey, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn max_marks(&self) -> f64 {
        self.subjects.iter().map(|s| s.max_marks).sum()
    }

    pub fn correct_answer(&self, question: u32) -> Option<Answer> {
        self.answers.get(&question).copied()
    }

    /// Checks the preconditions grading relies on. Gaps and overlaps between
    /// subject ranges are left to the caller.
    pub fn validate(&self) -> Result<(), AnswerKeyError> {
        if self.total_questions == 0 {
            return Err(AnswerKeyError::NoQuestions);
        }
        for subject in &self.subjects {
            let (start, end) = subject.question_range;
            if start > end {
                return Err(AnswerKeyError::InvertedRange {
                    subject: subject.name.clone(),
                    start,
                    end,
                });
            }
            if !subject.max_marks.is_finite() || subject.max_marks < 0.0 {
                return Err(AnswerKeyError::InvalidMaxMarks {
                    subject: subject.name.clone(),
                });
            }
        }
        if self.max_marks() == 0.0 {
            return Err(AnswerKeyError::ZeroMaxMarks);
        }
        Ok(())
    }
}

/// Who a sheet belongs to and when it was scanned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub student_id: String,
    pub student_name: String,
    pub timestamp: DateTime<Utc>,
}

impl Submission {
    pub fn new(student_id: impl Into<String>, student_name: impl Into<String>) -> Self {
        Self::at(student_id, student_name, Utc::now())
    }

    pub fn at(
        student_id: impl Into<String>,
        student_name: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Submission {
            student_id: student_id.into().trim().to_owned(),
            student_name: student_name.into().trim().to_owned(),
            timestamp,
        }
    }
}

#[cfg(test)]
pub(crate) mod unit_tests {
    use super::*;

    pub(crate) fn sample_key() -> AnswerKey {
        AnswerKey {
            id: "exam-1".to_owned(),
            exam_name: "Mock Test".to_owned(),
            total_questions: 4,
            subjects: vec![Subject {
                name: "Maths".to_owned(),
                question_range: (1, 4),
                max_marks: 8.0,
            }],
            answers: BTreeMap::from([(1, Answer::A), (2, Answer::B), (3, Answer::C), (4, Answer::D)]),
        }
    }

    #[test]
    fn test_answer_index_roundtrip() {
        for (idx, ans) in Answer::ALL.iter().enumerate() {
            assert_eq!(Answer::from_index(idx), Some(*ans));
            assert_eq!(ans.index(), idx);
        }
        assert_eq!(Answer::from_index(4), None);
    }

    #[test]
    fn test_marks_per_question() {
        let subject = Subject {
            name: "Physics".to_owned(),
            question_range: (21, 35),
            max_marks: 30.0,
        };
        assert_eq!(subject.question_count(), 15);
        assert_eq!(subject.marks_per_question(), 2.0);
        assert_eq!(subject.questions().count(), 15);
    }

    #[test]
    fn test_key_from_json() {
        let json = r#"{
            "id": "1700000000000",
            "examName": "Physics Mid-term",
            "totalQuestions": 50,
            "subjects": [
                { "name": "Mathematics", "questionRange": [1, 20], "maxMarks": 40 },
                { "name": "Physics", "questionRange": [21, 50], "maxMarks": 60 }
            ],
            "answers": { "1": "A", "2": "D", "50": "C" }
        }"#;
        let key = AnswerKey::from_json(json).unwrap();
        assert_eq!(key.total_questions, 50);
        assert_eq!(key.subjects[1].question_range, (21, 50));
        assert_eq!(key.correct_answer(2), Some(Answer::D));
        assert_eq!(key.correct_answer(3), None);
        assert_eq!(key.max_marks(), 100.0);
        assert!(key.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_max_marks() {
        let mut key = sample_key();
        key.subjects[0].max_marks = 0.0;
        assert!(matches!(key.validate(), Err(AnswerKeyError::ZeroMaxMarks)));

        key.subjects.clear();
        assert!(matches!(key.validate(), Err(AnswerKeyError::ZeroMaxMarks)));
    }

    #[test]
    fn test_validate_rejects_bad_structure() {
        let mut key = sample_key();
        key.total_questions = 0;
        assert!(matches!(key.validate(), Err(AnswerKeyError::NoQuestions)));

        let mut key = sample_key();
        key.subjects[0].question_range = (5, 2);
        assert!(matches!(
            key.validate(),
            Err(AnswerKeyError::InvertedRange { start: 5, end: 2, .. })
        ));

        let mut key = sample_key();
        key.subjects[0].max_marks = f64::NAN;
        assert!(matches!(key.validate(), Err(AnswerKeyError::InvalidMaxMarks { .. })));
    }

    #[test]
    fn test_submission_trims_names() {
        let sub = Submission::new("  STU001 ", " Jane Doe\n");
        assert_eq!(sub.student_id, "STU001");
        assert_eq!(sub.student_name, "Jane Doe");
    }
}
