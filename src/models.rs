use serde::Serialize;
use serde_json::{json, Map, Value};

// Teletext level 1 alpha colours, spacing attributes 0x00-0x07
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum TeletextColor {
    Black = 0,
    Red = 1,
    Green = 2,
    Yellow = 3,
    Blue = 4,
    Magenta = 5,
    Cyan = 6,
    White = 7,
}

impl TeletextColor {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Black),
            1 => Some(Self::Red),
            2 => Some(Self::Green),
            3 => Some(Self::Yellow),
            4 => Some(Self::Blue),
            5 => Some(Self::Magenta),
            6 => Some(Self::Cyan),
            7 => Some(Self::White),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Black => "black",
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
            Self::Magenta => "magenta",
            Self::Cyan => "cyan",
            Self::White => "white",
        }
    }
}

// Teletext row control codes (0x00-0x1F after parity strip)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TeletextControlCode {
    AlphaBlack = 0x00,
    AlphaRed = 0x01,
    AlphaGreen = 0x02,
    AlphaYellow = 0x03,
    AlphaBlue = 0x04,
    AlphaMagenta = 0x05,
    AlphaCyan = 0x06,
    AlphaWhite = 0x07,
    Flash = 0x08,
    Steady = 0x09,
    EndBox = 0x0A,
    StartBox = 0x0B,
    NormalHeight = 0x0C,
    DoubleHeight = 0x0D,
    DoubleWidth = 0x0E,
    DoubleSize = 0x0F,
    MosaicBlack = 0x10,
    MosaicRed = 0x11,
    MosaicGreen = 0x12,
    MosaicYellow = 0x13,
    MosaicBlue = 0x14,
    MosaicMagenta = 0x15,
    MosaicCyan = 0x16,
    MosaicWhite = 0x17,
    Conceal = 0x18,
    ContiguousMosaic = 0x19,
    SeparatedMosaic = 0x1A,
    Esc = 0x1B,
    BlackBackground = 0x1C,
    NewBackground = 0x1D,
    HoldMosaic = 0x1E,
    ReleaseMosaic = 0x1F,
}

impl TeletextControlCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use TeletextControlCode::*;
        let code = match byte {
            0x00 => AlphaBlack,
            0x01 => AlphaRed,
            0x02 => AlphaGreen,
            0x03 => AlphaYellow,
            0x04 => AlphaBlue,
            0x05 => AlphaMagenta,
            0x06 => AlphaCyan,
            0x07 => AlphaWhite,
            0x08 => Flash,
            0x09 => Steady,
            0x0A => EndBox,
            0x0B => StartBox,
            0x0C => NormalHeight,
            0x0D => DoubleHeight,
            0x0E => DoubleWidth,
            0x0F => DoubleSize,
            0x10 => MosaicBlack,
            0x11 => MosaicRed,
            0x12 => MosaicGreen,
            0x13 => MosaicYellow,
            0x14 => MosaicBlue,
            0x15 => MosaicMagenta,
            0x16 => MosaicCyan,
            0x17 => MosaicWhite,
            0x18 => Conceal,
            0x19 => ContiguousMosaic,
            0x1A => SeparatedMosaic,
            0x1B => Esc,
            0x1C => BlackBackground,
            0x1D => NewBackground,
            0x1E => HoldMosaic,
            0x1F => ReleaseMosaic,
            _ => return None,
        };
        Some(code)
    }

    /// Foreground colour set by an alpha or mosaic colour code.
    pub fn foreground(self) -> Option<TeletextColor> {
        let byte = self as u8;
        match byte {
            0x00..=0x07 => TeletextColor::from_code(byte),
            0x10..=0x17 => TeletextColor::from_code(byte - 0x10),
            _ => None,
        }
    }
}

// Control codes inside a TTI text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StlControlCode {
    Flash = 0x08,
    Steady = 0x09,
    EndBox = 0x0A,
    StartBox = 0x0B,
    NormalHeight = 0x0C,
    DoubleHeight = 0x0D,
    ItalicOn = 0x80,
    ItalicOff = 0x81,
    UnderlineOn = 0x82,
    UnderlineOff = 0x83,
    BoxingOn = 0x84,
    BoxingOff = 0x85,
    Newline = 0x8A,
    UnusedSpace = 0x8F,
}

impl StlControlCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use StlControlCode::*;
        let code = match byte {
            0x08 => Flash,
            0x09 => Steady,
            0x0A => EndBox,
            0x0B => StartBox,
            0x0C => NormalHeight,
            0x0D => DoubleHeight,
            0x80 => ItalicOn,
            0x81 => ItalicOff,
            0x82 => UnderlineOn,
            0x83 => UnderlineOff,
            0x84 => BoxingOn,
            0x85 => BoxingOff,
            0x8A => Newline,
            0x8F => UnusedSpace,
            _ => return None,
        };
        Some(code)
    }

    pub fn byte(self) -> u8 {
        self as u8
    }
}

// TTI justification code (JC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Justification {
    Unchanged = 0x00,
    Left = 0x01,
    #[default]
    Centered = 0x02,
    Right = 0x03,
}

impl Justification {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::Unchanged),
            0x01 => Some(Self::Left),
            0x02 => Some(Self::Centered),
            0x03 => Some(Self::Right),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Reader-side alignment; `Unchanged` has no alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

impl TextAlign {
    pub fn from_justification_code(code: u8) -> Option<Self> {
        match Justification::from_code(code)? {
            Justification::Left => Some(Self::Left),
            Justification::Centered => Some(Self::Center),
            Justification::Right => Some(Self::Right),
            Justification::Unchanged => None,
        }
    }

    pub fn justification_code(self) -> u8 {
        match self {
            Self::Left => Justification::Left.code(),
            Self::Center => Justification::Centered.code(),
            Self::Right => Justification::Right.code(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextSegment {
    pub text: String,
    pub foreground_color: TeletextColor,
    pub background_color: TeletextColor,
    pub double_height: bool,
    pub flash: bool,
    pub boxing: bool,
    pub concealed: bool,
}

impl TextSegment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            foreground_color: TeletextColor::White,
            background_color: TeletextColor::Black,
            double_height: false,
            flash: false,
            boxing: false,
            concealed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleLine {
    // Teletext row 1-24
    pub row: u8,
    pub segments: Vec<TextSegment>,
    pub double_height: bool,
    pub justification: Option<Justification>,
}

impl SubtitleLine {
    pub fn new(row: u8) -> Self {
        Self {
            row,
            segments: Vec::new(),
            double_height: false,
            justification: None,
        }
    }

    pub fn with_segments(row: u8, segments: Vec<TextSegment>) -> Self {
        let double_height = segments.iter().any(|s| s.double_height);
        Self {
            row,
            segments,
            double_height,
            justification: None,
        }
    }

    pub fn text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn has_content(&self) -> bool {
        self.segments.iter().any(|s| !s.text.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subtitle {
    pub index: u32,
    // Frames
    pub start_time: u64,
    pub end_time: u64,
    pub lines: Vec<SubtitleLine>,
    pub justification: Justification,
    pub vertical_position: u8,
}

impl Subtitle {
    pub fn has_content(&self) -> bool {
        self.lines.iter().any(|l| l.has_content())
    }

    /// Stripped text of every content-bearing line, space separated.
    /// Used to detect retransmitted pages.
    pub fn page_text(&self) -> String {
        page_text(&self.lines)
    }
}

pub(crate) fn page_text(lines: &[SubtitleLine]) -> String {
    lines
        .iter()
        .filter(|l| l.has_content())
        .map(|l| l.text().trim().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StyledSegment {
    pub text: String,
    // None means the default white
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<TeletextColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<TeletextColor>,
    pub italic: bool,
    pub bold: bool,
    pub underline: bool,
    pub flash: bool,
    pub double_height: bool,
}

impl StyledSegment {
    pub fn style(&self) -> CaptionStyle {
        CaptionStyle {
            color: self.color,
            background_color: self.background_color,
            italic: self.italic,
            bold: self.bold,
            underline: self.underline,
            flash: self.flash,
            double_height: self.double_height,
        }
    }

    pub fn same_style(&self, other: &StyledSegment) -> bool {
        self.style() == other.style()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CaptionStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<TeletextColor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<TeletextColor>,
    pub italic: bool,
    pub bold: bool,
    pub underline: bool,
    pub flash: bool,
    pub double_height: bool,
}

impl CaptionStyle {
    pub fn is_plain(&self) -> bool {
        *self == CaptionStyle::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Caption {
    // Microseconds
    pub start: u64,
    pub end: u64,
    pub start_timecode: String,
    pub end_timecode: String,
    pub text: String,
    pub style: CaptionStyle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_position: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub justification: Option<TextAlign>,
    // Only present when more than one distinct inline style survives merging
    #[serde(skip_serializing_if = "Option::is_none")]
    pub segments: Option<Vec<StyledSegment>>,
}

impl Caption {
    /// CSS-like view: `style` and `layout` are null when empty.
    pub fn to_json(&self) -> Value {
        let style = &self.style;
        let mut css = Map::new();
        if let Some(color) = style.color {
            css.insert("color".into(), json!(color.name()));
        }
        if let Some(background) = style.background_color {
            css.insert("background-color".into(), json!(background.name()));
        }
        if style.italic {
            css.insert("font-style".into(), json!("italic"));
        }
        if style.bold {
            css.insert("font-weight".into(), json!("bold"));
        }
        if style.underline {
            css.insert("text-decoration".into(), json!("underline"));
        }
        if style.flash {
            css.insert("visibility".into(), json!("flash"));
        }
        if style.double_height {
            css.insert("line-height".into(), json!("double"));
        }

        let mut layout = Map::new();
        if let Some(row) = self.vertical_position {
            layout.insert("vertical_position".into(), json!(row));
        }
        if let Some(align) = self.justification {
            layout.insert("text_align".into(), json!(align.as_str()));
        }

        let css = if css.is_empty() { Value::Null } else { Value::Object(css) };
        let layout = if layout.is_empty() { Value::Null } else { Value::Object(layout) };

        let mut value = json!({
            "start": self.start,
            "start_timecode": self.start_timecode,
            "end": self.end,
            "end_timecode": self.end_timecode,
            "text": self.text,
            "style": css,
            "layout": layout,
        });
        if let Some(segments) = &self.segments {
            value["segments"] = json!(segments);
        }
        value
    }
}

/// Timing metadata of the source video, as reported by the media prober.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoInfo {
    pub duration_seconds: f64,
    pub frame_rate: f64,
    pub total_frames: u64,
    pub start_timecode: String,
}

impl VideoInfo {
    pub fn new(duration_seconds: f64, frame_rate: f64) -> Self {
        let total_frames = (duration_seconds * frame_rate).max(0.0) as u64;
        Self {
            duration_seconds,
            frame_rate,
            total_frames,
            start_timecode: "00:00:00:00".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_codes() {
        for code in 0..8u8 {
            let color = TeletextColor::from_code(code).unwrap();
            assert_eq!(color.code(), code);
        }
        assert_eq!(TeletextColor::from_code(8), None);
        assert_eq!(TeletextColor::Magenta.name(), "magenta");
    }

    #[test]
    fn test_control_code_foreground() {
        assert_eq!(
            TeletextControlCode::from_byte(0x01).and_then(|c| c.foreground()),
            Some(TeletextColor::Red)
        );
        assert_eq!(
            TeletextControlCode::from_byte(0x16).and_then(|c| c.foreground()),
            Some(TeletextColor::Cyan)
        );
        assert_eq!(TeletextControlCode::Flash.foreground(), None);
        assert_eq!(TeletextControlCode::from_byte(0x20), None);
    }

    #[test]
    fn test_justification_mapping() {
        assert_eq!(TextAlign::from_justification_code(1), Some(TextAlign::Left));
        assert_eq!(TextAlign::from_justification_code(2), Some(TextAlign::Center));
        assert_eq!(TextAlign::from_justification_code(3), Some(TextAlign::Right));
        assert_eq!(TextAlign::from_justification_code(0), None);
        assert_eq!(TextAlign::from_justification_code(9), None);

        for code in 1..=3u8 {
            let align = TextAlign::from_justification_code(code).unwrap();
            assert_eq!(align.justification_code(), code);
        }
    }

    #[test]
    fn test_line_text_and_content() {
        let line = SubtitleLine::with_segments(
            20,
            vec![TextSegment::new("Hello "), TextSegment::new("World")],
        );
        assert_eq!(line.text(), "Hello World");
        assert!(line.has_content());

        let blank = SubtitleLine::with_segments(20, vec![TextSegment::new("   ")]);
        assert!(!blank.has_content());
        assert!(!SubtitleLine::new(3).has_content());
    }

    #[test]
    fn test_line_double_height_from_segments() {
        let mut tall = TextSegment::new("Big");
        tall.double_height = true;
        let line = SubtitleLine::with_segments(5, vec![TextSegment::new("a"), tall]);
        assert!(line.double_height);
    }

    #[test]
    fn test_page_text_skips_blank_lines() {
        let subtitle = Subtitle {
            index: 1,
            start_time: 0,
            end_time: 75,
            lines: vec![
                SubtitleLine::with_segments(20, vec![TextSegment::new("  First ")]),
                SubtitleLine::with_segments(21, vec![TextSegment::new("   ")]),
                SubtitleLine::with_segments(22, vec![TextSegment::new("Second")]),
            ],
            justification: Justification::Centered,
            vertical_position: 20,
        };
        assert_eq!(subtitle.page_text(), "First Second");
        assert!(subtitle.has_content());
    }

    fn caption(style: CaptionStyle) -> Caption {
        Caption {
            start: 1_000_000,
            end: 2_000_000,
            start_timecode: "00:00:01;00".into(),
            end_timecode: "00:00:02;00".into(),
            text: "Hi".into(),
            style,
            vertical_position: None,
            justification: None,
            segments: None,
        }
    }

    #[test]
    fn test_caption_json_view() {
        let plain = caption(CaptionStyle::default()).to_json();
        assert_eq!(plain["start"], 1_000_000);
        assert_eq!(plain["text"], "Hi");
        assert!(plain["style"].is_null());
        assert!(plain["layout"].is_null());
        assert!(plain.get("segments").is_none());

        let mut styled = caption(CaptionStyle {
            color: Some(TeletextColor::Yellow),
            background_color: Some(TeletextColor::Black),
            italic: true,
            bold: true,
            ..CaptionStyle::default()
        });
        styled.vertical_position = Some(20);
        styled.justification = Some(TextAlign::Center);
        let value = styled.to_json();

        assert_eq!(value["style"]["color"], "yellow");
        assert_eq!(value["style"]["background-color"], "black");
        assert_eq!(value["style"]["font-style"], "italic");
        assert_eq!(value["style"]["font-weight"], "bold");
        assert!(value["style"].get("text-decoration").is_none());
        assert_eq!(value["layout"]["vertical_position"], 20);
        assert_eq!(value["layout"]["text_align"], "center");
    }

    #[test]
    fn test_video_info_total_frames() {
        let info = VideoInfo::new(10.5, 25.0);
        assert_eq!(info.total_frames, 262);
    }
}
