//! # Filter Graphs
//!
//! Builds the filter-graph expressions handed to the media engine. The engine
//! does the pixel work; this module only decides which operations run and in
//! which order.
//!
//! ## Graphs:
//! - `Fit`: optional centre crop, scale preserving aspect ratio into the box,
//!   then pad to exactly the box with the image centred
//! - `FitWithWatermark`: `Fit` on input 0, watermark (input 1) scaled to the box
//!   and overlaid at the top-left corner after the pad step
//! - `Overlay`: watermark (input 1) scaled to the box and overlaid on input 0,
//!   used for stills that already have the right size

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TranscodeError;

/// Width:height ratio used for centre cropping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Crop to this ratio keeping the full input height, centred horizontally
    pub fn crop_expression(&self) -> String {
        format!(
            "crop=in_h*{}/{}:in_h:(in_w-ow)/2:0",
            self.width, self.height
        )
    }
}

impl FromStr for AspectRatio {
    type Err = TranscodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid =
            || TranscodeError::Validation(format!("invalid aspect ratio '{s}', expected W:H"));
        let (w, h) = s.split_once(':').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for AspectRatio {
    type Error = TranscodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AspectRatio> for String {
    fn from(ratio: AspectRatio) -> Self {
        ratio.to_string()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// A filter graph the engine applies between its inputs and one output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterGraph {
    Fit {
        width: u32,
        height: u32,
        crop: Option<AspectRatio>,
    },
    FitWithWatermark {
        width: u32,
        height: u32,
        crop: Option<AspectRatio>,
    },
    Overlay {
        width: u32,
        height: u32,
    },
}

impl FilterGraph {
    /// Number of input files the graph consumes
    pub fn input_count(&self) -> usize {
        match self {
            Self::Fit { .. } => 1,
            Self::FitWithWatermark { .. } | Self::Overlay { .. } => 2,
        }
    }

    /// Multi-input graphs go through `-filter_complex`, single-input ones through `-vf`
    pub fn is_complex(&self) -> bool {
        self.input_count() > 1
    }

    pub fn expression(&self) -> String {
        match self {
            Self::Fit {
                width,
                height,
                crop,
            } => fit_chain(*width, *height, *crop),
            Self::FitWithWatermark {
                width,
                height,
                crop,
            } => format!(
                "[0:v]{}[scaled];[1:v]scale={w}:{h}[watermark];[scaled][watermark]overlay=0:0",
                fit_chain(*width, *height, *crop),
                w = width,
                h = height,
            ),
            Self::Overlay { width, height } => format!(
                "[1:v]scale={width}:{height}[watermark];[0:v][watermark]overlay=0:0"
            ),
        }
    }
}

fn fit_chain(width: u32, height: u32, crop: Option<AspectRatio>) -> String {
    let fit = format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,\
         pad={width}:{height}:(ow-iw)/2:(oh-ih)/2"
    );
    match crop {
        Some(ratio) => format!("{},{}", ratio.crop_expression(), fit),
        None => fit,
    }
}
