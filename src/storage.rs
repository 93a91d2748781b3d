use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::SecondsFormat;
use serde::Serialize;

use crate::errors::CsvError;
use crate::scoring::{GradedResult, PASS_PERCENTAGE};
use crate::state::AnswerKey;

/// Receives finished results for storage or display.
pub trait ResultSink {
    type Error;

    fn accept(&mut self, result: &GradedResult) -> Result<(), Self::Error>;
}

/// Keeps results in arrival order.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    results: Vec<GradedResult>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn results(&self) -> &[GradedResult] {
        &self.results
    }

    pub fn summary(&self) -> CohortSummary {
        CohortSummary::from_results(&self.results)
    }
}

impl ResultSink for MemorySink {
    type Error = Infallible;

    fn accept(&mut self, result: &GradedResult) -> Result<(), Infallible> {
        self.results.push(result.clone());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSummary {
    pub students: usize,
    pub average_percentage: f64,
    pub top_percentage: f64,
    /// Share of students at or above the pass mark, in percent.
    pub pass_rate: f64,
}

impl CohortSummary {
    pub fn from_results(results: &[GradedResult]) -> Self {
        if results.is_empty() {
            return CohortSummary {
                students: 0,
                average_percentage: 0.0,
                top_percentage: 0.0,
                pass_rate: 0.0,
            };
        }
        let count = results.len() as f64;
        let passed = results
            .iter()
            .filter(|r| r.percentage >= PASS_PERCENTAGE)
            .count();
        CohortSummary {
            students: results.len(),
            average_percentage: results.iter().map(|r| r.percentage).sum::<f64>() / count,
            top_percentage: results
                .iter()
                .map(|r| r.percentage)
                .fold(f64::NEG_INFINITY, f64::max),
            pass_rate: passed as f64 / count * 100.0,
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    #[serde(rename = "Student ID")]
    student_id: &'a str,
    #[serde(rename = "Student Name")]
    student_name: &'a str,
    #[serde(rename = "Exam")]
    exam: &'a str,
    #[serde(rename = "Total Score")]
    total_score: String,
    #[serde(rename = "Max Marks")]
    max_marks: String,
    #[serde(rename = "Percentage")]
    percentage: String,
    #[serde(rename = "Grade")]
    grade: &'static str,
    #[serde(rename = "Timestamp")]
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct SubjectRow<'a> {
    #[serde(rename = "Student ID")]
    student_id: &'a str,
    #[serde(rename = "Student Name")]
    student_name: &'a str,
    #[serde(rename = "Exam")]
    exam: &'a str,
    #[serde(rename = "Subject")]
    subject: &'a str,
    #[serde(rename = "Score")]
    score: String,
    #[serde(rename = "Max Marks")]
    max_marks: String,
    #[serde(rename = "Percentage")]
    percentage: String,
}

const UNKNOWN_EXAM: &str = "Unknown";

/// Writes one summary row per result.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    exam_names: BTreeMap<String, String>,
}

impl CsvSink<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, CsvError> {
        Ok(CsvSink::new(File::create(path)?))
    }
}

impl<W: Write> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        CsvSink {
            writer: csv::Writer::from_writer(writer),
            exam_names: BTreeMap::new(),
        }
    }

    /// Resolves exam ids to display names; unresolved ids print as "Unknown".
    pub fn with_exams<'a>(mut self, keys: impl IntoIterator<Item = &'a AnswerKey>) -> Self {
        self.exam_names.extend(
            keys.into_iter()
                .map(|key| (key.id.clone(), key.exam_name.clone())),
        );
        self
    }

    /// Flushes and hands back the underlying writer.
    pub fn finish(self) -> Result<W, CsvError> {
        self.writer
            .into_inner()
            .map_err(|e| CsvError::FileOperationFailed(e.into_error()))
    }
}

impl<W: Write> ResultSink for CsvSink<W> {
    type Error = CsvError;

    fn accept(&mut self, result: &GradedResult) -> Result<(), CsvError> {
        let exam = self
            .exam_names
            .get(&result.exam_id)
            .map_or(UNKNOWN_EXAM, String::as_str);
        self.writer.serialize(SummaryRow {
            student_id: &result.student_id,
            student_name: &result.student_name,
            exam,
            total_score: result.total_score.to_string(),
            max_marks: result.max_marks.to_string(),
            percentage: format!("{}%", result.percentage),
            grade: result.grade().as_str(),
            timestamp: result
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        })?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Per-subject rows for one result followed by a `Total` row.
pub fn export_subject_breakdown<W: Write>(
    result: &GradedResult,
    key: &AnswerKey,
    writer: W,
) -> Result<(), CsvError> {
    let mut wtr = csv::Writer::from_writer(writer);

    for subject in &key.subjects {
        let score = result.scores.get(&subject.name).copied().unwrap_or_default();
        let share = if subject.max_marks > 0.0 {
            score / subject.max_marks * 100.0
        } else {
            0.0
        };
        wtr.serialize(SubjectRow {
            student_id: &result.student_id,
            student_name: &result.student_name,
            exam: &key.exam_name,
            subject: &subject.name,
            score: score.to_string(),
            max_marks: subject.max_marks.to_string(),
            percentage: format!("{share:.1}%"),
        })?;
    }
    wtr.serialize(SubjectRow {
        student_id: &result.student_id,
        student_name: &result.student_name,
        exam: &key.exam_name,
        subject: "Total",
        score: result.total_score.to_string(),
        max_marks: result.max_marks.to_string(),
        percentage: format!("{}%", result.percentage),
    })?;

    wtr.flush()?;
    Ok(())
}
