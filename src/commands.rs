use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use crate::config::DetectionOptions;
use crate::evaluate::{evaluate_sheet, Evaluation};
use crate::image::read_from_path;
use crate::scoring::{Grade, QuestionReview};
use crate::state::{AnswerKey, Submission};
use crate::storage::{CsvSink, ResultSink};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The answer sheet image, already cropped and aligned.
    pub image: PathBuf,
    /// The answer key (JSON) to grade against
    #[arg(short, long)]
    pub key: PathBuf,
    #[arg(long)]
    pub student_id: String,
    #[arg(long)]
    pub student_name: String,
    /// Detection options (JSON); missing fields keep their defaults
    #[arg(short, long)]
    pub options: Option<PathBuf>,
    /// Write a summary row for the sheet to this CSV file
    #[arg(long)]
    pub csv: Option<PathBuf>,
    /// Include the per-question review in the output
    #[arg(long)]
    pub review: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    #[serde(flatten)]
    evaluation: &'a Evaluation,
    grade: Grade,
    #[serde(skip_serializing_if = "Option::is_none")]
    review: Option<Vec<QuestionReview>>,
}

pub fn run() -> anyhow::Result<()> {
    let args = Cli::parse();

    let key_json = fs::read_to_string(&args.key)
        .with_context(|| format!("Cannot read answer key {}", args.key.display()))?;
    let key = AnswerKey::from_json(&key_json).context("Malformed answer key")?;
    let options = match &args.options {
        Some(path) => DetectionOptions::from_json_file(path)?,
        None => DetectionOptions::default(),
    };

    let image = read_from_path(&args.image)
        .with_context(|| format!("Cannot load {}", args.image.display()))?;
    let evaluation = evaluate_sheet(
        &key,
        &image,
        Submission::new(args.student_id, args.student_name),
        &options,
    )?;

    if let Some(path) = &args.csv {
        let mut sink = CsvSink::create(path)?.with_exams([&key]);
        sink.accept(&evaluation.result)?;
        sink.finish()?;
    }

    let report = Report {
        evaluation: &evaluation,
        grade: evaluation.result.grade(),
        review: args.review.then(|| evaluation.result.review(&key)),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
