//! Grid scan for filled bubbles.
//!
//! Candidate centers are visited on a fixed pixel step, independent of the
//! image resolution. Each center is scored by sampling concentric rings and
//! the qualifying ones are mapped onto an assumed sheet layout of 12 rows by
//! 20 columns (5 questions of 4 options per row). The layout is never checked
//! against the printed sheet, so keys with far more or fewer than 60
//! questions land in the wrong cells.

use std::f64::consts::PI;

use log::debug;
use rayon::prelude::*;

use crate::config::DetectionOptions;
use crate::image::PixelBuffer;
use crate::state::Answer;

/// A single sample darker than this counts towards the dark ratio.
pub const DARK_SAMPLE_THRESHOLD: f64 = 100.0;
/// Radial distance between sampled rings.
pub const RING_STEP: usize = 2;
/// Angular distance between samples on a ring, in degrees.
pub const ANGLE_STEP_DEG: usize = 45;

pub const GRID_ROWS: u32 = 12;
pub const GRID_COLS: u32 = 20;
pub const OPTIONS_PER_QUESTION: u32 = 4;
pub const QUESTIONS_PER_ROW: u32 = GRID_COLS / OPTIONS_PER_QUESTION;

/// A scan position that looks like a filled bubble.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkedRegion {
    pub x: u32,
    pub y: u32,
    /// Average darkness over the ring samples.
    pub darkness: f64,
    pub dark_ratio: f64,
    pub question: u32,
    pub option: Answer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingScore {
    pub avg_darkness: f64,
    pub dark_ratio: f64,
}

pub struct BubbleDetector {
    options: DetectionOptions,
    /// `(dx, dy)` of every ring sample around a center.
    offsets: Vec<(f64, f64)>,
}

impl BubbleDetector {
    pub fn new(options: &DetectionOptions) -> Self {
        let offsets = (0..=options.bubble_radius as usize)
            .step_by(RING_STEP)
            .flat_map(|r| {
                (0..360).step_by(ANGLE_STEP_DEG).map(move |angle| {
                    let theta = angle as f64 * PI / 180.0;
                    (r as f64 * theta.cos(), r as f64 * theta.sin())
                })
            })
            .collect();
        BubbleDetector {
            options: *options,
            offsets,
        }
    }

    /// Samples the rings around `(x, y)`. `None` if no sample fell inside the image.
    pub fn score_at(&self, image: &PixelBuffer, x: u32, y: u32) -> Option<RingScore> {
        let (mut total_darkness, mut dark_count, mut sample_count) = (0.0f64, 0u32, 0u32);
        for &(dx, dy) in &self.offsets {
            let sx = (f64::from(x) + dx).floor();
            let sy = (f64::from(y) + dy).floor();
            if sx < 0.0 || sy < 0.0 {
                continue;
            }
            let Some(darkness) = image.darkness_at(sx as u32, sy as u32) else {
                continue;
            };
            total_darkness += darkness;
            if darkness > DARK_SAMPLE_THRESHOLD {
                dark_count += 1;
            }
            sample_count += 1;
        }
        (sample_count > 0).then(|| RingScore {
            avg_darkness: total_darkness / f64::from(sample_count),
            dark_ratio: f64::from(dark_count) / f64::from(sample_count),
        })
    }

    /// Both conditions are needed: a dark line is dark on average but covers too few samples.
    pub fn is_marked(&self, score: &RingScore) -> bool {
        score.avg_darkness > self.options.min_darkness
            && score.dark_ratio > self.options.dark_ratio_threshold
    }

    fn scan_row(&self, image: &PixelBuffer, y: u32, total_questions: u32) -> Vec<MarkedRegion> {
        let radius = self.options.bubble_radius;
        (radius..image.width().saturating_sub(radius))
            .step_by(self.options.scan_step as usize)
            .filter_map(|x| {
                let score = self.score_at(image, x, y)?;
                if !self.is_marked(&score) {
                    return None;
                }
                let (question, option) = infer_cell(x, y, image.width(), image.height());
                (question <= total_questions).then_some(MarkedRegion {
                    x,
                    y,
                    darkness: score.avg_darkness,
                    dark_ratio: score.dark_ratio,
                    question,
                    option,
                })
            })
            .collect()
    }

    /// All candidate regions of `image`, in row-major scan order.
    pub fn detect(&self, image: &PixelBuffer, total_questions: u32) -> Vec<MarkedRegion> {
        let radius = self.options.bubble_radius;
        let rows: Vec<u32> = (radius..image.height().saturating_sub(radius))
            .step_by(self.options.scan_step as usize)
            .collect();

        let mut regions: Vec<MarkedRegion> = if self.options.parallel {
            rows.into_par_iter()
                .flat_map_iter(|y| self.scan_row(image, y, total_questions))
                .collect()
        } else {
            rows.into_iter()
                .flat_map(|y| self.scan_row(image, y, total_questions))
                .collect()
        };
        // shards may come back in any order, ties are broken by scan position
        regions.sort_by_key(|r| (r.y, r.x));

        debug!(
            "{} candidate regions on a {}x{} image",
            regions.len(),
            image.width(),
            image.height()
        );
        regions
    }
}

/// Maps a scan position onto the assumed 12 x 20 sheet grid.
pub fn infer_cell(x: u32, y: u32, width: u32, height: u32) -> (u32, Answer) {
    let row = (f64::from(y) / (f64::from(height) / f64::from(GRID_ROWS))).floor() as u32;
    let col = (f64::from(x) / (f64::from(width) / f64::from(GRID_COLS))).floor() as u32;
    let question = col / OPTIONS_PER_QUESTION + 1 + row * QUESTIONS_PER_ROW;
    let option = Answer::ALL[(col % OPTIONS_PER_QUESTION) as usize];
    (question, option)
}
