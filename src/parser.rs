use std::collections::BTreeMap;

use log::{debug, info};

use crate::config::ParserConfig;
use crate::models::{
    page_text, Justification, Subtitle, SubtitleLine, TeletextColor, TeletextControlCode,
    TextSegment,
};
use crate::teletext::{decode_packet, strip_parity, teletext_char, TeletextPacket, PACKET_SIZE};
use crate::vanc::{extract_packets, IndexedPacket};

// Durations in frames (25 fps nominal)
const PROVISIONAL_DURATION: u64 = 75;
const MIN_DURATION: i64 = 25;
const MAX_DURATION: i64 = 75;
const LAST_DURATION: u64 = 50;
const GAP_FRAMES: i64 = 1;

const DEFAULT_VERTICAL_POSITION: u8 = 20;
const MAX_VERTICAL_POSITION: u8 = 23;

#[derive(Debug, Default)]
struct MagazineState {
    // magazine * 100 + page, for logging
    page: u16,
    rows: BTreeMap<u8, SubtitleLine>,
    is_subtitle_page: bool,
}

/// Assembles teletext subtitle pages into timed subtitles. One parser
/// handles one buffer; `parse` consumes it.
pub struct TeletextParser {
    config: ParserConfig,
    magazines: BTreeMap<u8, MagazineState>,
    subtitles: Vec<Subtitle>,
    frame_count: u64,
    total_packets: usize,
}

impl TeletextParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            config,
            magazines: BTreeMap::new(),
            subtitles: Vec::new(),
            frame_count: 0,
            total_packets: 0,
        }
    }

    pub fn parse(self, data: &[u8]) -> Vec<Subtitle> {
        let packets = extract_packets(data);
        self.parse_packets(&packets)
    }

    pub fn parse_packets(mut self, packets: &[IndexedPacket]) -> Vec<Subtitle> {
        self.total_packets = packets.len();

        if let Some(total_frames) = self.config.total_frames.filter(|&t| t > 0) {
            if self.total_packets > 0 {
                info!(
                    "Mapping {} packets to {} video frames",
                    self.total_packets, total_frames
                );
            }
        }

        for packet in packets {
            // Padding lines
            if packet.data[0] == 0x00 || packet.data[0] == 0xFF {
                continue;
            }

            self.frame_count = self.frame_for(packet.index);
            self.process_packet(&packet.data);
        }

        let pending: Vec<u8> = self
            .magazines
            .iter()
            .filter(|(_, state)| state.is_subtitle_page)
            .map(|(&magazine, _)| magazine)
            .collect();
        for magazine in pending {
            self.flush_page(magazine);
        }

        calculate_end_times(&mut self.subtitles);

        debug!("Assembled {} subtitles", self.subtitles.len());
        self.subtitles
    }

    fn frame_for(&self, index: usize) -> u64 {
        match self.config.total_frames {
            Some(total_frames) if total_frames > 0 && self.total_packets > 0 => {
                ((index as f64 / self.total_packets as f64) * total_frames as f64) as u64
            }
            // Roughly two packets per frame
            _ => (index / 2) as u64,
        }
    }

    fn process_packet(&mut self, data: &[u8; PACKET_SIZE]) {
        let packet = decode_packet(data);
        let is_subtitle = packet.is_subtitle_page();

        match packet {
            TeletextPacket::Header { magazine, page, .. } => {
                self.process_header(magazine, page, is_subtitle);
            }
            TeletextPacket::Row {
                magazine,
                row,
                data,
            } => self.process_row(magazine, row, &data),
            TeletextPacket::Enhancement { .. } => {}
        }
    }

    fn process_header(&mut self, magazine: u8, page: u8, is_subtitle: bool) {
        let previous_was_subtitle = self
            .magazines
            .get(&magazine)
            .map(|state| state.is_subtitle_page)
            .unwrap_or(false);

        if previous_was_subtitle {
            self.flush_page(magazine);
        }

        let state = self.magazines.entry(magazine).or_default();
        state.page = magazine as u16 * 100 + page as u16;
        state.rows.clear();
        state.is_subtitle_page = is_subtitle;
    }

    fn process_row(&mut self, magazine: u8, row: u8, data: &[u8]) {
        let tolerance = self.config.justification_tolerance;
        let Some(state) = self.magazines.get_mut(&magazine) else {
            return;
        };
        if !state.is_subtitle_page {
            return;
        }

        let line = parse_row(row, data, tolerance);
        if line.has_content() {
            state.rows.insert(row, line);
        }
    }

    fn flush_page(&mut self, magazine: u8) {
        let Some(state) = self.magazines.get_mut(&magazine) else {
            return;
        };
        if state.rows.is_empty() {
            return;
        }

        let page = state.page;
        let lines: Vec<SubtitleLine> = std::mem::take(&mut state.rows).into_values().collect();

        if !lines.iter().any(|l| l.has_content()) {
            return;
        }

        // Teletext retransmits pages; only exact repeats are dropped
        let text = page_text(&lines);
        if let Some(last) = self.subtitles.last() {
            if last.page_text() == text {
                debug!("Skipping repeated page P{} at frame {}", page, self.frame_count);
                return;
            }
        }

        let first_content = lines.iter().find(|l| l.has_content());
        let vertical_position = first_content
            .map(|l| l.row)
            .unwrap_or(DEFAULT_VERTICAL_POSITION)
            .min(MAX_VERTICAL_POSITION);
        let justification = lines
            .iter()
            .filter(|l| l.has_content())
            .find_map(|l| l.justification)
            .unwrap_or(Justification::Centered);

        debug!(
            "Subtitle {} from P{} at frame {}: {:?}",
            self.subtitles.len() + 1,
            page,
            self.frame_count,
            text
        );

        self.subtitles.push(Subtitle {
            index: self.subtitles.len() as u32 + 1,
            start_time: self.frame_count,
            end_time: self.frame_count + PROVISIONAL_DURATION,
            lines,
            justification,
            vertical_position,
        });
    }
}

/// Every subtitle but the last ends between 1 and 3 seconds after its start
/// and one frame before the next; the last one lasts 2 seconds.
pub fn calculate_end_times(subtitles: &mut [Subtitle]) {
    for i in 0..subtitles.len().saturating_sub(1) {
        let start = subtitles[i].start_time as i64;
        let next_start = subtitles[i + 1].start_time as i64;

        let end = (next_start - GAP_FRAMES)
            .min(start + MAX_DURATION)
            .max(start + MIN_DURATION);
        subtitles[i].end_time = end as u64;
    }

    if let Some(last) = subtitles.last_mut() {
        last.end_time = last.start_time + LAST_DURATION;
    }
}

/// Justification from the balance of leading and trailing whitespace in the
/// row text (control codes removed, spacing kept).
pub fn detect_line_justification(raw_text: &str, tolerance: usize) -> Justification {
    if raw_text.trim().is_empty() {
        return Justification::Centered;
    }

    let total = raw_text.chars().count();
    let left = total - raw_text.trim_start().chars().count();
    let right = total - raw_text.trim_end().chars().count();

    if left.abs_diff(right) <= tolerance {
        Justification::Centered
    } else if left > right {
        Justification::Right
    } else {
        Justification::Left
    }
}

struct RowStyle {
    foreground: TeletextColor,
    background: TeletextColor,
    double_height: bool,
    flash: bool,
    boxing: bool,
}

impl RowStyle {
    fn new() -> Self {
        Self {
            foreground: TeletextColor::White,
            background: TeletextColor::Black,
            double_height: false,
            flash: false,
            boxing: false,
        }
    }

    fn segment(&self, text: String) -> TextSegment {
        TextSegment {
            text,
            foreground_color: self.foreground,
            background_color: self.background,
            double_height: self.double_height,
            flash: self.flash,
            boxing: self.boxing,
            concealed: false,
        }
    }
}

/// Splits the 40 data bytes of a row packet into styled segments.
pub fn parse_row(row: u8, data: &[u8], tolerance: usize) -> SubtitleLine {
    let raw_text: String = data
        .iter()
        .map(|&b| strip_parity(b))
        .filter(|&b| b >= 0x20)
        .map(teletext_char)
        .collect();

    let mut line = SubtitleLine::new(row);
    line.justification = Some(detect_line_justification(&raw_text, tolerance));

    let mut style = RowStyle::new();
    let mut current = String::new();

    for &raw in data {
        let byte = strip_parity(raw);
        if byte >= 0x20 {
            current.push(teletext_char(byte));
            continue;
        }

        if !current.is_empty() {
            line.segments.push(style.segment(std::mem::take(&mut current)));
        }

        let Some(code) = TeletextControlCode::from_byte(byte) else {
            continue;
        };
        if let Some(color) = code.foreground() {
            style.foreground = color;
            continue;
        }

        match code {
            TeletextControlCode::Flash => style.flash = true,
            TeletextControlCode::Steady => style.flash = false,
            TeletextControlCode::StartBox => style.boxing = true,
            TeletextControlCode::EndBox => style.boxing = false,
            TeletextControlCode::DoubleHeight => {
                style.double_height = true;
                line.double_height = true;
            }
            TeletextControlCode::NormalHeight => style.double_height = false,
            TeletextControlCode::BlackBackground => style.background = TeletextColor::Black,
            TeletextControlCode::NewBackground => style.background = style.foreground,
            _ => {}
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        line.segments.push(style.segment(tail.to_string()));
    }

    line
}
