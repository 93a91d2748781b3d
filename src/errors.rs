use std::fmt::Write;

#[derive(thiserror::Error, Debug)]
pub enum EvaluationError {
    #[error("Invalid answer key: {0}")]
    InvalidAnswerKey(#[from] AnswerKeyError),
    #[error("Invalid pixel buffer: {0}")]
    InvalidPixelBuffer(#[from] BufferError),
    #[error("Invalid detection options: {0}")]
    InvalidOptions(#[from] ConfigError),
}

#[derive(thiserror::Error, Debug)]
pub enum AnswerKeyError {
    #[error("Answer key must contain at least one question")]
    NoQuestions,
    #[error("Subjects carry zero marks in total, percentage is undefined")]
    ZeroMaxMarks,
    #[error("Subject \"{subject}\" has negative or non-finite max marks")]
    InvalidMaxMarks { subject: String },
    #[error("Subject \"{subject}\" has an inverted question range [{start}, {end}]")]
    InvertedRange { subject: String, start: u32, end: u32 },
}

#[derive(thiserror::Error, Debug)]
pub enum BufferError {
    #[error("Image has zero area ({width}x{height})")]
    ZeroDimension { width: u32, height: u32 },
    #[error("Sample buffer holds {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Unsupported channel count {0}")]
    UnsupportedChannels(i32),
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read options file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed options file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(&'static str),
}

#[cfg(feature = "opencv")]
#[derive(thiserror::Error, Debug)]
pub enum UploadError {
    #[error("Non UTF-8 path")]
    NonUtfPath,
    #[error("Invalid image format")]
    NotImage,
    #[error("Unable to convert image: {} (errno {})", .0.message, .0.code)]
    OpenCvError(#[from] opencv::Error),
    #[error("Decoded image is unusable: {0}")]
    InvalidBuffer(#[from] BufferError),
}

#[derive(thiserror::Error, Debug)]
pub enum CsvError {
    #[error("Cannot open/write file: {0}")]
    FileOperationFailed(#[from] std::io::Error),
    #[error("Failed to serialize CSV: {0}")]
    Csv(#[from] csv::Error),
}

pub fn fmt_error_chain_of(mut err: &dyn std::error::Error) -> String {
    let mut str = err.to_string();
    while let Some(src) = err.source() {
        _ = write!(str, "\n  -> Caused by {src}");
        err = src;
    }
    str
}

#[macro_export]
macro_rules! err_log {
    ($error: expr) => {
        log::error!("{}", $crate::errors::fmt_error_chain_of($error))
    };
}
