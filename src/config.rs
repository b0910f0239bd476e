use chrono::NaiveDate;
use regex::Regex;

use crate::error::{Result, StlError};

pub const DEFAULT_FRAME_RATE: u32 = 25;
pub const DEFAULT_PROGRAM_TITLE: &str = "Untitled";

// Leading/trailing whitespace difference still treated as centred
pub const DEFAULT_JUSTIFICATION_TOLERANCE: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct ParserConfig {
    // Frames in the source video; enables linear packet -> frame mapping
    pub total_frames: Option<u64>,
    pub frame_rate: f64,
    pub justification_tolerance: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            total_frames: None,
            frame_rate: DEFAULT_FRAME_RATE as f64,
            justification_tolerance: DEFAULT_JUSTIFICATION_TOLERANCE,
        }
    }
}

impl ParserConfig {
    pub fn new(total_frames: Option<u64>, frame_rate: f64) -> Self {
        Self {
            total_frames,
            frame_rate,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CumulativeStatusMode {
    // Every TTI block carries CS 0x00, even when a subtitle spans several
    #[default]
    Legacy,
    // Multi-block subtitles get 1 (first), 2 (intermediate), 3 (last)
    Conformant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriterConfig {
    pub program_title: String,
    pub frame_rate: u32,
    pub cumulative_status: CumulativeStatusMode,
    // Creation/revision date written to the GSI; today when unset
    pub creation_date: Option<NaiveDate>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            program_title: DEFAULT_PROGRAM_TITLE.to_string(),
            frame_rate: DEFAULT_FRAME_RATE,
            cumulative_status: CumulativeStatusMode::Legacy,
            creation_date: None,
        }
    }
}

impl WriterConfig {
    pub fn new(program_title: impl Into<String>, frame_rate: u32) -> Self {
        Self {
            program_title: program_title.into(),
            frame_rate,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.frame_rate == 0 || self.frame_rate > 99 {
            return Err(StlError::invalid_frame_rate(self.frame_rate));
        }
        Ok(())
    }
}

/// Parses "25", "25.0" or "25/1" (and "30000/1001") into frames per second.
pub fn parse_frame_rate(value: &str) -> Result<f64> {
    let pattern = Regex::new(r"^\s*(\d+(?:\.\d+)?)\s*(?:/\s*(\d+(?:\.\d+)?))?\s*$")
        .map_err(|_| StlError::invalid_frame_rate(value))?;

    let caps = pattern
        .captures(value)
        .ok_or_else(|| StlError::invalid_frame_rate(value))?;

    let numerator: f64 = caps[1]
        .parse()
        .map_err(|_| StlError::invalid_frame_rate(value))?;
    let denominator: f64 = match caps.get(2) {
        Some(d) => d
            .as_str()
            .parse()
            .map_err(|_| StlError::invalid_frame_rate(value))?,
        None => 1.0,
    };

    if denominator == 0.0 || numerator == 0.0 {
        return Err(StlError::invalid_frame_rate(value));
    }

    Ok(numerator / denominator)
}

/// Whole frame rate for the STL header and timecodes, rounded to nearest.
pub fn stl_frame_rate(fps: f64) -> u32 {
    fps.round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25").unwrap(), 25.0);
        assert_eq!(parse_frame_rate("25.0").unwrap(), 25.0);
        assert_eq!(parse_frame_rate("25/1").unwrap(), 25.0);
        assert_eq!(parse_frame_rate(" 50 / 2 ").unwrap(), 25.0);
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
    }

    #[test]
    fn test_parse_frame_rate_rejects_garbage() {
        assert!(parse_frame_rate("").is_err());
        assert!(parse_frame_rate("fast").is_err());
        assert!(parse_frame_rate("25/0").is_err());
        assert!(parse_frame_rate("0").is_err());
        assert!(parse_frame_rate("-25").is_err());
    }

    #[test]
    fn test_stl_frame_rate_rounds() {
        assert_eq!(stl_frame_rate(25.0), 25);
        assert_eq!(stl_frame_rate(30000.0 / 1001.0), 30);
        assert_eq!(stl_frame_rate(23.976), 24);
    }

    #[test]
    fn test_writer_config_validation() {
        assert!(WriterConfig::default().validate().is_ok());
        assert!(WriterConfig::new("Title", 30).validate().is_ok());
        assert!(matches!(
            WriterConfig::new("Title", 0).validate(),
            Err(StlError::InvalidFrameRate { .. })
        ));
        assert!(WriterConfig::new("Title", 100).validate().is_err());
    }

    #[test]
    fn test_defaults() {
        let parser = ParserConfig::default();
        assert_eq!(parser.total_frames, None);
        assert_eq!(parser.frame_rate, 25.0);
        assert_eq!(parser.justification_tolerance, 3);

        let writer = WriterConfig::default();
        assert_eq!(writer.program_title, "Untitled");
        assert_eq!(writer.cumulative_status, CumulativeStatusMode::Legacy);
    }
}
