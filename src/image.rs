#[cfg(feature = "opencv")]
use std::path::Path;

#[cfg(feature = "opencv")]
use opencv::{
    core::Mat,
    imgcodecs::{imread, ImreadModes},
    imgproc,
    prelude::*,
};

use crate::errors::BufferError;
#[cfg(feature = "opencv")]
use crate::errors::UploadError;

/// Sample layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Gray,
    Rgb,
    Rgba,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }
}

/// A decoded, already aligned sheet image. Row-major, origin top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    pub fn from_raw(
        width: u32,
        height: u32,
        format: PixelFormat,
        data: Vec<u8>,
    ) -> Result<PixelBuffer, BufferError> {
        if width == 0 || height == 0 {
            return Err(BufferError::ZeroDimension { width, height });
        }
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(BufferError::SizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(PixelBuffer {
            width,
            height,
            format,
            data,
        })
    }

    /// A buffer of one repeated RGBA colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Result<PixelBuffer, BufferError> {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        PixelBuffer::from_raw(width, height, PixelFormat::Rgba, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Rejects buffers that would make an empty scan look like an all-blank sheet.
    pub fn validate(&self) -> Result<(), BufferError> {
        if self.width == 0 || self.height == 0 {
            return Err(BufferError::ZeroDimension {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| (y as usize * self.width as usize + x as usize) * self.format.channels())
    }

    /// `(r, g, b)` at `(x, y)`, or `None` outside the image.
    pub fn sample(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let idx = self.offset(x, y)?;
        Some(match self.format {
            PixelFormat::Gray => [self.data[idx]; 3],
            PixelFormat::Rgb | PixelFormat::Rgba => {
                [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
            }
        })
    }

    /// `255 - mean(r, g, b)` at `(x, y)`, or `None` outside the image.
    pub fn darkness_at(&self, x: u32, y: u32) -> Option<f64> {
        self.sample(x, y).map(darkness)
    }

    /// Overwrites one pixel, ignoring coordinates outside the image.
    pub fn put_rgb(&mut self, x: u32, y: u32, rgb: [u8; 3]) {
        let Some(idx) = self.offset(x, y) else {
            return;
        };
        match self.format {
            PixelFormat::Gray => {
                let sum: u16 = rgb.iter().map(|&c| u16::from(c)).sum();
                self.data[idx] = (sum / 3) as u8;
            }
            PixelFormat::Rgb | PixelFormat::Rgba => {
                self.data[idx..idx + 3].copy_from_slice(&rgb);
            }
        }
    }

    /// Copies an 8-bit 1, 3 or 4 channel mat. Colour mats are expected in RGB(A) order.
    #[cfg(feature = "opencv")]
    pub fn from_mat(mat: &Mat) -> Result<PixelBuffer, UploadError> {
        let format = match mat.channels() {
            1 => PixelFormat::Gray,
            3 => PixelFormat::Rgb,
            4 => PixelFormat::Rgba,
            n => return Err(BufferError::UnsupportedChannels(n).into()),
        };
        let width = u32::try_from(mat.cols()).map_err(|_| UploadError::NotImage)?;
        let height = u32::try_from(mat.rows()).map_err(|_| UploadError::NotImage)?;
        let data = if mat.is_continuous() {
            mat.data_bytes()?.to_vec()
        } else {
            mat.try_clone()?.data_bytes()?.to_vec()
        };
        Ok(PixelBuffer::from_raw(width, height, format, data)?)
    }
}

/// Inverse brightness of one pixel, in `[0, 255]`.
pub fn darkness([r, g, b]: [u8; 3]) -> f64 {
    let brightness = (f64::from(r) + f64::from(g) + f64::from(b)) / 3.0;
    255.0 - brightness
}

/// Decodes an image file into an RGB [`PixelBuffer`].
#[cfg(feature = "opencv")]
pub fn read_from_path(path: &Path) -> Result<PixelBuffer, UploadError> {
    let path_str = path.to_str().ok_or(UploadError::NonUtfPath)?;
    let mat = imread(path_str, ImreadModes::IMREAD_COLOR.into())
        .map_err(|_| UploadError::NotImage)
        .and_then(|mat| {
            if mat.empty() {
                Err(UploadError::NotImage)
            } else {
                Ok(mat)
            }
        })?;
    let mut rgb = Mat::default();
    imgproc::cvt_color_def(&mat, &mut rgb, imgproc::COLOR_BGR2RGB)?;
    PixelBuffer::from_mat(&rgb)
}
