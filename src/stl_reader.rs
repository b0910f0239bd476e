use std::fmt;

use bytes::Buf;
use log::{debug, info, warn};
use serde::Serialize;

use crate::charset::CharacterCodeTable;
use crate::error::{Result, StlError};
use crate::gsi::{disk_format_code, parse_gsi, GsiInfo, GSI_SIZE};
use crate::models::{Caption, CaptionStyle, StlControlCode, StyledSegment, TeletextColor, TextAlign};
use crate::timecode::{format_timecode, tti_timecode_seconds};

pub const TTI_SIZE: usize = 128;

const USER_DATA_EXTENSION: u8 = 0xF0;
const MAX_VERTICAL_POSITION: u8 = 23;

/// Text and style decoded from one 112-byte TTI text field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedText {
    pub text: String,
    // Style of the last segment
    pub style: CaptionStyle,
    pub segments: Vec<StyledSegment>,
}

#[derive(Clone, Copy)]
enum Flag {
    Italic,
    Bold,
    Underline,
    Flash,
    DoubleHeight,
}

#[derive(Default)]
struct FieldDecoder {
    // color None is white
    style: CaptionStyle,
    segments: Vec<StyledSegment>,
    run: String,
}

impl FieldDecoder {
    fn flush(&mut self) {
        if self.run.is_empty() {
            return;
        }
        let style = self.style;
        self.segments.push(StyledSegment {
            text: std::mem::take(&mut self.run),
            color: style.color,
            background_color: style.background_color,
            italic: style.italic,
            bold: style.bold,
            underline: style.underline,
            flash: style.flash,
            double_height: style.double_height,
        });
    }

    fn flag_mut(&mut self, flag: Flag) -> &mut bool {
        match flag {
            Flag::Italic => &mut self.style.italic,
            Flag::Bold => &mut self.style.bold,
            Flag::Underline => &mut self.style.underline,
            Flag::Flash => &mut self.style.flash,
            Flag::DoubleHeight => &mut self.style.double_height,
        }
    }

    fn set_flag(&mut self, flag: Flag, value: bool) {
        if *self.flag_mut(flag) != value {
            self.flush();
            *self.flag_mut(flag) = value;
        }
    }

    fn set_color(&mut self, color: TeletextColor) {
        let color = (color != TeletextColor::White).then_some(color);
        if color == self.style.color {
            return;
        }
        // Colour codes occupy a character cell
        if !self.run.is_empty() && !self.run.ends_with(' ') {
            self.run.push(' ');
        }
        self.flush();
        self.style.color = color;
    }

    fn newline(&mut self) {
        let last_is_newline = if self.run.is_empty() {
            self.segments
                .last()
                .map(|s| s.text.ends_with('\n'))
                .unwrap_or(false)
        } else {
            self.run.ends_with('\n')
        };
        if last_is_newline {
            return;
        }
        self.run.push('\n');
        self.flush();
        self.style.color = None;
    }

    fn control(&mut self, code: StlControlCode) {
        match code {
            StlControlCode::Flash => self.set_flag(Flag::Flash, true),
            StlControlCode::Steady => self.set_flag(Flag::Flash, false),
            StlControlCode::EndBox | StlControlCode::UnusedSpace => {}
            StlControlCode::StartBox => {
                if self.style.background_color.is_none() {
                    self.flush();
                    self.style.background_color = Some(TeletextColor::Black);
                }
            }
            StlControlCode::NormalHeight => self.set_flag(Flag::DoubleHeight, false),
            StlControlCode::DoubleHeight => self.set_flag(Flag::DoubleHeight, true),
            StlControlCode::ItalicOn => self.set_flag(Flag::Italic, true),
            StlControlCode::ItalicOff => self.set_flag(Flag::Italic, false),
            StlControlCode::UnderlineOn => self.set_flag(Flag::Underline, true),
            StlControlCode::UnderlineOff => self.set_flag(Flag::Underline, false),
            // Boxing is reported as bold
            StlControlCode::BoxingOn => self.set_flag(Flag::Bold, true),
            StlControlCode::BoxingOff => self.set_flag(Flag::Bold, false),
            StlControlCode::Newline => self.newline(),
        }
    }

    fn feed(&mut self, byte: u8, cct: CharacterCodeTable) {
        if let Some(code) = StlControlCode::from_byte(byte) {
            self.control(code);
            return;
        }

        match byte {
            0x00..=0x07 => {
                if let Some(color) = TeletextColor::from_code(byte) {
                    self.set_color(color);
                }
            }
            0x20..=0x7E => self.run.push(byte as char),
            0x80..=0xFF => {
                if let Some(c) = cct.decode_byte(byte) {
                    self.run.push(c);
                }
            }
            _ => {}
        }
    }

    fn finish(mut self) -> DecodedText {
        self.flush();
        let segments = merge_segments(&self.segments);
        DecodedText {
            text: segments.iter().map(|s| s.text.as_str()).collect(),
            style: segments.last().map(StyledSegment::style).unwrap_or_default(),
            segments,
        }
    }
}

pub fn decode_text_field(field: &[u8], cct: CharacterCodeTable) -> DecodedText {
    let mut decoder = FieldDecoder::default();
    for &byte in field {
        decoder.feed(byte, cct);
    }
    decoder.finish()
}

/// Joins adjacent segments that share every style attribute.
pub fn merge_segments(segments: &[StyledSegment]) -> Vec<StyledSegment> {
    let mut merged: Vec<StyledSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(last) if last.same_style(segment) => last.text.push_str(&segment.text),
            _ => merged.push(segment.clone()),
        }
    }
    merged
}

/// TTI block with an intermediate extension block number but a "single"
/// cumulative status. Strict STL consumers reject these files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentWarning {
    pub block: usize,
    pub subtitle_number: u16,
    pub extension_block: u8,
    pub cumulative_status: u8,
}

impl fmt::Display for ContentWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TTI block {} (SN {}): extension block {} with cumulative status {}",
            self.block, self.subtitle_number, self.extension_block, self.cumulative_status
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedStl {
    pub captions: Vec<Caption>,
    pub fps: f64,
    pub gsi: GsiInfo,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ContentWarning>,
}

struct PendingCaption {
    subtitle_number: u16,
    start: f64,
    end: f64,
    style: CaptionStyle,
    vertical_position: Option<u8>,
    justification: Option<TextAlign>,
    chunks: Vec<String>,
    segments: Vec<StyledSegment>,
}

impl PendingCaption {
    fn absorb(&mut self, start: f64, end: f64, decoded: &DecodedText, justification: Option<TextAlign>) {
        self.start = self.start.min(start);
        self.end = self.end.max(end);

        let style = &decoded.style;
        self.style.italic |= style.italic;
        self.style.bold |= style.bold;
        self.style.underline |= style.underline;
        self.style.flash |= style.flash;
        self.style.double_height |= style.double_height;
        self.style.color = self.style.color.or(style.color);
        self.style.background_color = self.style.background_color.or(style.background_color);
        self.justification = self.justification.or(justification);
    }

    fn finalize(self, fps: f64) -> Option<Caption> {
        let text = self.chunks.concat().trim().to_string();
        if text.is_empty() {
            return None;
        }

        let segments = merge_segments(&self.segments);

        Some(Caption {
            start: (self.start * 1_000_000.0) as u64,
            end: (self.end * 1_000_000.0) as u64,
            start_timecode: format_timecode(self.start, fps),
            end_timecode: format_timecode(self.end, fps),
            text,
            style: self.style,
            vertical_position: self.vertical_position,
            justification: self.justification,
            segments: (segments.len() > 1).then_some(segments),
        })
    }
}

fn has_printable(field: &[u8]) -> bool {
    field.iter().any(|b| (32..127).contains(b))
}

/// Parses consecutive TTI blocks. A trailing partial block is ignored.
/// Blocks are accumulated per subtitle number and emitted on a single or
/// last cumulative status, or at the end of the stream.
pub fn parse_tti_blocks(
    data: &[u8],
    fps: f64,
    cct: CharacterCodeTable,
) -> (Vec<Caption>, Vec<ContentWarning>) {
    let mut captions = Vec::new();
    let mut warnings = Vec::new();
    // Insertion order is kept for the end-of-stream flush
    let mut pending: Vec<PendingCaption> = Vec::new();

    for (block, raw) in data.chunks_exact(TTI_SIZE).enumerate() {
        let field = &raw[16..];
        let mut tti = raw;

        tti.advance(1); // subtitle group
        let subtitle_number = tti.get_u16();
        let extension_block = tti.get_u8();
        let cumulative_status = tti.get_u8();
        let mut tci = [0u8; 4];
        tti.copy_to_slice(&mut tci);
        let mut tco = [0u8; 4];
        tti.copy_to_slice(&mut tco);
        let vertical_position = tti.get_u8();
        let justification_code = tti.get_u8();

        if (1..=254).contains(&extension_block) && cumulative_status == 0 {
            warnings.push(ContentWarning {
                block,
                subtitle_number,
                extension_block,
                cumulative_status,
            });
        }

        // A control-only tail of a pending multi-block subtitle is not user data
        let continues_pending = (1..=3).contains(&cumulative_status)
            && pending.iter().any(|p| p.subtitle_number == subtitle_number);

        if extension_block >= USER_DATA_EXTENSION && !has_printable(field) && !continues_pending {
            debug!("Skipping user data block {} (EBN {:#04x})", block, extension_block);
            continue;
        }

        let decoded = decode_text_field(field, cct);
        let start = tti_timecode_seconds(tci, fps);
        let end = tti_timecode_seconds(tco, fps);
        let justification = TextAlign::from_justification_code(justification_code);

        let position = match pending.iter().position(|p| p.subtitle_number == subtitle_number) {
            Some(position) => {
                pending[position].absorb(start, end, &decoded, justification);
                position
            }
            None => {
                pending.push(PendingCaption {
                    subtitle_number,
                    start,
                    end,
                    style: decoded.style,
                    vertical_position: (vertical_position <= MAX_VERTICAL_POSITION)
                        .then_some(vertical_position),
                    justification,
                    chunks: Vec::new(),
                    segments: Vec::new(),
                });
                pending.len() - 1
            }
        };

        let entry = &mut pending[position];
        if !decoded.text.is_empty() {
            entry.chunks.push(decoded.text);
        }
        entry.segments.extend(decoded.segments);

        if cumulative_status == 0x00 || cumulative_status == 0x03 {
            let entry = pending.remove(position);
            captions.extend(entry.finalize(fps));
        }
    }

    for entry in pending {
        captions.extend(entry.finalize(fps));
    }

    (captions, warnings)
}

/// Reads STL files. The frame rate comes from the Disk Format Code unless
/// overridden.
#[derive(Debug, Clone, Default)]
pub struct StlReader {
    fps_override: Option<f64>,
}

impl StlReader {
    pub fn new(fps_override: Option<f64>) -> Self {
        Self { fps_override }
    }

    pub fn read(&self, raw: &[u8]) -> Result<DecodedStl> {
        if raw.is_empty() {
            return Err(StlError::MissingData);
        }
        if raw.len() < GSI_SIZE {
            return Err(StlError::TooShort { len: raw.len() });
        }

        let dfc = disk_format_code(raw);
        if !dfc.to_uppercase().starts_with("STL") {
            return Err(StlError::InvalidDiskFormatCode { dfc });
        }

        let (mut gsi, detected_fps) = parse_gsi(&raw[..GSI_SIZE])?;
        let fps = self.fps_override.unwrap_or(detected_fps);
        gsi.frame_rate = fps;

        let cct = CharacterCodeTable::from_code(&gsi.character_code_table);
        let body = &raw[GSI_SIZE..];
        let (captions, warnings) = parse_tti_blocks(body, fps, cct);

        if !warnings.is_empty() {
            warn!(
                "{} TTI blocks have an intermediate extension block number with cumulative status 0; strict STL consumers may reject this file (first: {})",
                warnings.len(),
                warnings[0]
            );
        }

        info!(
            "Read {} captions from {} TTI blocks at {} fps",
            captions.len(),
            body.len() / TTI_SIZE,
            fps
        );

        Ok(DecodedStl {
            captions,
            fps,
            gsi,
            warnings,
        })
    }
}
