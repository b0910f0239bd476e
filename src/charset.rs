use encoding_rs::{Encoding, ISO_8859_5, ISO_8859_6, ISO_8859_7, ISO_8859_8};
use serde::Serialize;

/// GSI character code table (CCT, bytes 12-13).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CharacterCodeTable {
    #[default]
    Latin,
    Cyrillic,
    Arabic,
    Greek,
    Hebrew,
}

impl CharacterCodeTable {
    /// Unknown codes fall back to Latin.
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "01" => Self::Cyrillic,
            "02" => Self::Arabic,
            "03" => Self::Greek,
            "04" => Self::Hebrew,
            _ => Self::Latin,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Latin => "00",
            Self::Cyrillic => "01",
            Self::Arabic => "02",
            Self::Greek => "03",
            Self::Hebrew => "04",
        }
    }

    fn encoding(self) -> Option<&'static Encoding> {
        match self {
            Self::Latin => None,
            Self::Cyrillic => Some(ISO_8859_5),
            Self::Arabic => Some(ISO_8859_6),
            Self::Greek => Some(ISO_8859_7),
            Self::Hebrew => Some(ISO_8859_8),
        }
    }

    /// Decodes one byte; `None` when the table has no character for it.
    pub fn decode_byte(self, byte: u8) -> Option<char> {
        match self.encoding() {
            None => Some(byte as char),
            Some(encoding) => encoding
                .decode_without_bom_handling_and_without_replacement(&[byte])
                .and_then(|s| s.chars().next()),
        }
    }
}

// Latin-1 byte for a character, if it has one
pub fn latin1_byte(c: char) -> Option<u8> {
    u8::try_from(u32::from(c)).ok()
}

/// Latin-1 encodes `text`, substituting `replacement` for anything outside it.
pub fn encode_latin1(text: &str, replacement: u8) -> Vec<u8> {
    text.chars()
        .map(|c| latin1_byte(c).unwrap_or(replacement))
        .collect()
}
