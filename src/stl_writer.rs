use std::io::Write;

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{Local, NaiveDate};
use log::debug;

use crate::charset::{encode_latin1, latin1_byte};
use crate::config::{CumulativeStatusMode, WriterConfig};
use crate::error::{Result, StlError};
use crate::gsi::GSI_SIZE;
use crate::models::{StlControlCode, Subtitle, TeletextColor, TextSegment};
use crate::timecode::frames_to_components;

pub const TTI_SIZE: usize = 128;
pub const TEXT_FIELD_SIZE: usize = 112;

const TITLE_SIZE: usize = 32;
const MAX_COUNT: usize = 99_999;
const MAX_VERTICAL_POSITION: u8 = 23;
const LAST_EXTENSION_BLOCK: u8 = 0xFF;

// Cumulative status values
const CS_SINGLE: u8 = 0x00;
const CS_FIRST: u8 = 0x01;
const CS_INTERMEDIATE: u8 = 0x02;
const CS_LAST: u8 = 0x03;

const LINE_BREAK: [u8; 4] = [0x0A, 0x0A, 0x8A, 0x8A];
const LINE_START: [u8; 2] = [0x0B, 0x0B];
const TEXT_END: [u8; 2] = [0x0A, 0x0A];

/// Serialises subtitles to EBU Tech 3264 STL: one GSI block, then one or
/// more TTI blocks per subtitle.
pub struct StlWriter {
    config: WriterConfig,
}

impl StlWriter {
    pub fn new(config: WriterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn creation_date(&self) -> NaiveDate {
        self.config
            .creation_date
            .unwrap_or_else(|| Local::now().date_naive())
    }

    pub fn build_gsi(&self, subtitle_count: usize, block_count: usize) -> Bytes {
        let mut gsi = BytesMut::with_capacity(GSI_SIZE);
        let date = self.creation_date().format("%y%m%d").to_string();

        let title: String = self.config.program_title.chars().take(TITLE_SIZE).collect();

        put_field(&mut gsi, b"850", 3); // code page
        put_field(&mut gsi, format!("STL{:02}.01", self.config.frame_rate).as_bytes(), 8);
        put_field(&mut gsi, b"1", 1); // display standard, open subtitles
        put_field(&mut gsi, b"00", 2); // character code table, Latin
        put_field(&mut gsi, b"", 2); // language
        put_field(&mut gsi, &encode_latin1(&title, b'?'), TITLE_SIZE);
        put_field(&mut gsi, b"", 176); // episode, translation, reference
        put_field(&mut gsi, date.as_bytes(), 6); // creation date
        put_field(&mut gsi, date.as_bytes(), 6); // revision date
        put_field(&mut gsi, b"00", 2); // revision number
        put_field(&mut gsi, count_field(block_count).as_bytes(), 5);
        put_field(&mut gsi, count_field(subtitle_count).as_bytes(), 5);
        put_field(&mut gsi, b"001", 3); // subtitle groups
        put_field(&mut gsi, b"40", 2); // max displayable characters
        put_field(&mut gsi, b"23", 2); // max displayable rows
        put_field(&mut gsi, b"1", 1); // timecode status
        put_field(&mut gsi, b"00000000", 8); // start of programme
        put_field(&mut gsi, b"00000000", 8); // first in-cue
        put_field(&mut gsi, b"1", 1); // total disks
        put_field(&mut gsi, b"1", 1); // disk sequence number
        put_field(&mut gsi, b"", 3); // country of origin
        put_field(&mut gsi, b"", 171); // publisher, editor, spare
        put_field(&mut gsi, b"", GSI_SIZE - 448); // user-defined area

        debug_assert_eq!(gsi.len(), GSI_SIZE);
        gsi.freeze()
    }

    /// TTI blocks for one subtitle. Text longer than one field is split
    /// across extension blocks; the last one is numbered 0xFF.
    /// Fails when the subtitle index does not fit the 16-bit subtitle number.
    pub fn tti_blocks(&self, subtitle: &Subtitle) -> Result<Vec<Bytes>> {
        let number = u16::try_from(subtitle.index).map_err(|_| StlError::SubtitleNumberOverflow {
            index: subtitle.index,
        })?;
        let text = encode_text(subtitle);
        let chunks: Vec<&[u8]> = if text.is_empty() {
            vec![&text[..]]
        } else {
            text.chunks(TEXT_FIELD_SIZE).collect()
        };

        let count = chunks.len();
        Ok(chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let extension = if i + 1 == count {
                    LAST_EXTENSION_BLOCK
                } else {
                    i as u8
                };
                let status = self.cumulative_status(i, count);
                self.tti_block(subtitle, number, chunk, extension, status)
            })
            .collect())
    }

    fn cumulative_status(&self, chunk: usize, count: usize) -> u8 {
        match self.config.cumulative_status {
            CumulativeStatusMode::Legacy => CS_SINGLE,
            CumulativeStatusMode::Conformant => match chunk {
                _ if count == 1 => CS_SINGLE,
                0 => CS_FIRST,
                c if c + 1 == count => CS_LAST,
                _ => CS_INTERMEDIATE,
            },
        }
    }

    fn tti_block(
        &self,
        subtitle: &Subtitle,
        number: u16,
        text: &[u8],
        extension: u8,
        status: u8,
    ) -> Bytes {
        let mut tti = BytesMut::with_capacity(TTI_SIZE);

        tti.put_u8(0x00); // subtitle group
        tti.put_u16_le(number);
        tti.put_u8(extension);
        tti.put_u8(status);
        tti.put_slice(&self.timecode(subtitle.start_time));
        tti.put_slice(&self.timecode(subtitle.end_time));
        tti.put_u8(subtitle.vertical_position.min(MAX_VERTICAL_POSITION));
        tti.put_u8(subtitle.justification.code());
        tti.put_u8(0x00); // comment flag

        let text = &text[..text.len().min(TEXT_FIELD_SIZE)];
        tti.put_slice(text);
        tti.put_bytes(StlControlCode::UnusedSpace.byte(), TEXT_FIELD_SIZE - text.len());

        tti.freeze()
    }

    fn timecode(&self, frames: u64) -> [u8; 4] {
        let (h, m, s, f) = frames_to_components(frames, self.config.frame_rate);
        [h.min(u8::MAX as u64) as u8, m as u8, s as u8, f as u8]
    }

    pub fn to_bytes(&self, subtitles: &[Subtitle]) -> Result<Bytes> {
        let mut blocks: Vec<Bytes> = Vec::new();
        for subtitle in subtitles {
            blocks.extend(self.tti_blocks(subtitle)?);
        }

        let mut out = BytesMut::with_capacity(GSI_SIZE + blocks.len() * TTI_SIZE);
        out.put(self.build_gsi(subtitles.len(), blocks.len()));
        for block in blocks {
            out.put(block);
        }

        debug!(
            "Encoded {} subtitles into {} bytes",
            subtitles.len(),
            out.len()
        );
        Ok(out.freeze())
    }

    pub fn write<W: Write>(&self, subtitles: &[Subtitle], destination: &mut W) -> Result<()> {
        destination.write_all(&self.to_bytes(subtitles)?)?;
        destination.flush()?;
        Ok(())
    }
}

fn put_field(buf: &mut BytesMut, value: &[u8], len: usize) {
    let value = &value[..value.len().min(len)];
    buf.put_slice(value);
    buf.put_bytes(b' ', len - value.len());
}

fn count_field(count: usize) -> String {
    format!("{:05}", count.min(MAX_COUNT))
}

fn visible(segment: &TextSegment) -> bool {
    !segment.concealed && !segment.text.trim().is_empty()
}

/// Encodes a subtitle's lines as a TTI text byte stream, before splitting
/// and padding. Empty when no line has visible text.
pub fn encode_text(subtitle: &Subtitle) -> Vec<u8> {
    let lines: Vec<(Vec<&TextSegment>, bool)> = subtitle
        .lines
        .iter()
        .map(|line| {
            let segments: Vec<&TextSegment> = line.segments.iter().filter(|s| visible(s)).collect();
            (segments, line.double_height)
        })
        .filter(|(segments, _)| !segments.is_empty())
        .collect();

    if lines.is_empty() {
        return Vec::new();
    }

    let double_height = lines.iter().any(|(_, dh)| *dh);
    let mut out = Vec::new();

    for (i, (segments, _)) in lines.iter().enumerate() {
        if i > 0 {
            out.extend_from_slice(&LINE_BREAK);
        }
        if double_height {
            out.push(StlControlCode::DoubleHeight.byte());
        }
        out.extend_from_slice(&LINE_START);

        let mut color = TeletextColor::White;
        let mut flash = false;
        let last = segments.len() - 1;

        for (j, segment) in segments.iter().enumerate() {
            if segment.foreground_color != color {
                color = segment.foreground_color;
                out.push(color.code());
            }
            if segment.flash != flash {
                flash = segment.flash;
                out.push(if flash {
                    StlControlCode::Flash.byte()
                } else {
                    StlControlCode::Steady.byte()
                });
            }

            // Line edges are trimmed, inner spacing kept
            let mut text = segment.text.as_str();
            if j == 0 {
                text = text.trim_start();
            }
            if j == last {
                text = text.trim_end();
            }
            out.extend(text.chars().map(|c| latin1_byte(c).unwrap_or(b' ')));
        }
    }

    out.extend_from_slice(&TEXT_END);
    out
}
