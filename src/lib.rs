//! Teletext (OP-47/VANC) subtitle extraction and EBU Tech 3264 STL
//! encoding and decoding.

pub mod charset;
pub mod config;
pub mod error;
pub mod gsi;
pub mod hamming;
pub mod models;
pub mod parser;
pub mod stl_reader;
pub mod stl_writer;
pub mod teletext;
pub mod timecode;
pub mod vanc;

use bytes::Bytes;
use log::info;

pub use config::{CumulativeStatusMode, ParserConfig, WriterConfig};
pub use error::{Result, StlError};
pub use gsi::GsiInfo;
pub use models::{Caption, CaptionStyle, StyledSegment, Subtitle, SubtitleLine, TextSegment};
pub use parser::TeletextParser;
pub use stl_reader::{ContentWarning, DecodedStl, StlReader};
pub use stl_writer::StlWriter;

/// Encodes subtitles as an STL file with the default writer settings.
pub fn encode(subtitles: &[Subtitle], frame_rate: u32, program_title: &str) -> Result<Bytes> {
    let writer = StlWriter::new(WriterConfig::new(program_title, frame_rate))?;
    writer.to_bytes(subtitles)
}

/// Decodes an STL file, taking the frame rate from the Disk Format Code unless overridden.
pub fn decode(stl: &[u8], fps_override: Option<f64>) -> Result<DecodedStl> {
    StlReader::new(fps_override).read(stl)
}

/// Extracts timed subtitles from a raw OP-47/VANC or bare teletext dump.
/// Fails when the buffer holds too few teletext sync patterns.
pub fn extract_teletext(raw: &[u8], total_frames: Option<u64>, frame_rate: f64) -> Result<Vec<Subtitle>> {
    let found = vanc::count_sync_patterns(raw);
    if found < vanc::MIN_SYNC_PATTERNS {
        return Err(StlError::NoTeletextData {
            found,
            required: vanc::MIN_SYNC_PATTERNS,
        });
    }
    info!("Found {} teletext sync patterns", found);

    let config = ParserConfig::new(total_frames, frame_rate);
    Ok(TeletextParser::new(config).parse(raw))
}
