//! Optical mark recognition for answer sheets: find the filled bubble of each
//! question on an aligned sheet image and grade the answers against a key.

#[cfg(feature = "cli")]
pub mod commands;
pub mod config;
pub mod detection;
pub mod errors;
pub mod evaluate;
pub mod image;
pub mod resolve;
pub mod scoring;
pub mod state;
pub mod storage;
#[cfg(test)]
mod test_utils;

pub use config::DetectionOptions;
pub use errors::EvaluationError;
pub use evaluate::{evaluate_batch, evaluate_sheet, Evaluation};
pub use image::{PixelBuffer, PixelFormat};
pub use scoring::GradedResult;
pub use state::{Answer, AnswerKey, Subject, Submission};
