use serde::Serialize;

use crate::error::{Result, StlError};

pub const GSI_SIZE: usize = 1024;

const DEFAULT_FPS: f64 = 25.0;

/// Fields of the General Subtitle Information block the reader exposes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GsiInfo {
    pub disk_format_code: String,
    pub title: String,
    pub programme_name: String,
    pub character_code_table: String,
    pub language: Option<String>,
    pub frame_rate: f64,
}

// ASCII view of a field, non-ASCII bytes dropped
fn ascii_field(bytes: &[u8]) -> String {
    bytes
        .iter()
        .filter(|b| b.is_ascii())
        .map(|&b| b as char)
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn disk_format_code(gsi: &[u8]) -> String {
    let end = gsi.len().min(11);
    if end <= 3 {
        return String::new();
    }
    ascii_field(&gsi[3..end])
}

/// Frame rate hinted by a Disk Format Code such as "STL25.01". This is a
/// substring match checked in the order 25, 30, 24.
pub fn derive_fps_from_dfc(dfc: &str) -> f64 {
    let dfc = dfc.to_uppercase();
    if dfc.contains("25") {
        25.0
    } else if dfc.contains("30") {
        30.0
    } else if dfc.contains("24") {
        24.0
    } else {
        DEFAULT_FPS
    }
}

/// Maps the two hex digits of the GSI language code to an ISO 639-1 tag.
pub fn decode_language_code(code: &[u8]) -> Option<String> {
    let code = ascii_field(code);
    if code.is_empty() {
        return None;
    }
    let index = u8::from_str_radix(&code, 16).ok()?;
    language_tag(index).map(str::to_string)
}

// EBU Tech 3264 Appendix 3
fn language_tag(index: u8) -> Option<&'static str> {
    let tag = match index {
        0x01 => "sq",
        0x02 => "br",
        0x03 => "ca",
        0x04 => "hr",
        0x05 => "cy",
        0x06 => "cs",
        0x07 => "da",
        0x08 => "de",
        0x09 => "en",
        0x0A => "es",
        0x0B => "eo",
        0x0C => "et",
        0x0D => "eu",
        0x0E => "fo",
        0x0F => "fr",
        0x10 => "fy",
        0x11 => "ga",
        0x12 => "gd",
        0x13 => "gl",
        0x14 => "is",
        0x15 => "it",
        0x16 => "se",
        0x17 => "la",
        0x18 => "lv",
        0x19 => "lb",
        0x1A => "lt",
        0x1B => "hu",
        0x1C => "mt",
        0x1D => "nl",
        0x1E => "no",
        0x1F => "oc",
        0x20 => "pl",
        0x21 => "pt",
        0x22 => "ro",
        0x23 => "rm",
        0x24 => "sr",
        0x25 => "sk",
        0x26 => "sl",
        0x27 => "fi",
        0x28 => "sv",
        0x29 => "tr",
        // Flemish
        0x2A => "nl",
        0x2B => "wa",
        0x45 => "zu",
        0x46 => "vi",
        0x47 => "uz",
        0x48 => "ur",
        0x49 => "uk",
        0x4A => "th",
        0x4B => "te",
        0x4C => "tt",
        0x4D => "ta",
        0x4E => "tg",
        0x4F => "sw",
        0x51 => "so",
        0x52 => "si",
        0x53 => "sn",
        0x54 => "sh",
        0x56 => "ru",
        0x57 => "qu",
        0x58 => "ps",
        0x59 => "pa",
        0x5A => "fa",
        0x5C => "or",
        0x5D => "ne",
        0x5E => "nd",
        0x5F => "mr",
        // Moldavian
        0x60 => "ro",
        0x61 => "ms",
        0x62 => "mg",
        0x63 => "mk",
        0x64 => "lo",
        0x65 => "ko",
        0x66 => "km",
        0x67 => "kk",
        0x68 => "kn",
        0x69 => "ja",
        0x6A => "id",
        0x6B => "hi",
        0x6C => "he",
        0x6D => "ha",
        0x6E => "gn",
        0x6F => "gu",
        0x70 => "el",
        0x71 => "ka",
        0x72 => "ff",
        // Dari
        0x73 => "fa",
        0x74 => "cv",
        0x75 => "zh",
        0x76 => "my",
        0x77 => "bg",
        0x78 => "bn",
        0x79 => "be",
        0x7A => "bm",
        0x7B => "az",
        0x7C => "as",
        0x7D => "hy",
        0x7E => "ar",
        0x7F => "am",
        _ => return None,
    };
    Some(tag)
}

/// Parses a 1024-byte GSI block. Returns the info and the derived frame rate.
pub fn parse_gsi(gsi: &[u8]) -> Result<(GsiInfo, f64)> {
    if gsi.len() != GSI_SIZE {
        return Err(StlError::InvalidGsiLength { len: gsi.len() });
    }

    let disk_format_code = disk_format_code(gsi);
    let fps = derive_fps_from_dfc(&disk_format_code);

    let info = GsiInfo {
        title: ascii_field(&gsi[16..48]),
        programme_name: ascii_field(&gsi[48..80]),
        character_code_table: ascii_field(&gsi[12..14]),
        language: decode_language_code(&gsi[14..16]),
        frame_rate: fps,
        disk_format_code,
    };

    Ok((info, fps))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::GSI_SIZE;

    pub fn make_gsi_block(dfc: &[u8], cct: &[u8], title: &[u8], language: &[u8]) -> Vec<u8> {
        fn put(gsi: &mut [u8], start: usize, len: usize, value: &[u8]) {
            let field = &mut gsi[start..start + len];
            field.fill(b' ');
            let n = value.len().min(len);
            field[..n].copy_from_slice(&value[..n]);
        }

        let mut gsi = vec![0u8; GSI_SIZE];
        gsi[0..3].copy_from_slice(b"850");
        put(&mut gsi, 3, 8, dfc);
        put(&mut gsi, 12, 2, cct);
        put(&mut gsi, 14, 2, language);
        put(&mut gsi, 16, 32, title);
        put(&mut gsi, 48, 32, b"");
        gsi
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::make_gsi_block;
    use super::*;

    #[test]
    fn test_decode_language_code() {
        assert_eq!(decode_language_code(b"09").as_deref(), Some("en"));
        assert_eq!(decode_language_code(b"0F").as_deref(), Some("fr"));
        assert_eq!(decode_language_code(b"0f").as_deref(), Some("fr"));
        assert_eq!(decode_language_code(b"08").as_deref(), Some("de"));
        assert_eq!(decode_language_code(b"0A").as_deref(), Some("es"));
        assert_eq!(decode_language_code(b"56").as_deref(), Some("ru"));
        assert_eq!(decode_language_code(b"7F").as_deref(), Some("am"));
    }

    #[test]
    fn test_decode_language_code_unknown() {
        assert_eq!(decode_language_code(b"00"), None);
        assert_eq!(decode_language_code(b""), None);
        assert_eq!(decode_language_code(b"  "), None);
        assert_eq!(decode_language_code(b"ZZ"), None);
        assert_eq!(decode_language_code(b"50"), None);
        assert_eq!(decode_language_code(b"2C"), None);
    }

    #[test]
    fn test_derive_fps_from_dfc() {
        assert_eq!(derive_fps_from_dfc("STL25.01"), 25.0);
        assert_eq!(derive_fps_from_dfc("STL30.01"), 30.0);
        assert_eq!(derive_fps_from_dfc("STL24.01"), 24.0);
        assert_eq!(derive_fps_from_dfc("stl30.01"), 30.0);
        assert_eq!(derive_fps_from_dfc("STL50.01"), 25.0);
        assert_eq!(derive_fps_from_dfc(""), 25.0);
    }

    #[test]
    fn test_parse_gsi() {
        let gsi = make_gsi_block(b"STL30.01", b"01", b"My Programme", b"09");
        let (info, fps) = parse_gsi(&gsi).unwrap();

        assert_eq!(fps, 30.0);
        assert_eq!(info.frame_rate, 30.0);
        assert_eq!(info.disk_format_code, "STL30.01");
        assert_eq!(info.title, "My Programme");
        assert_eq!(info.programme_name, "");
        assert_eq!(info.character_code_table, "01");
        assert_eq!(info.language.as_deref(), Some("en"));
    }

    #[test]
    fn test_parse_gsi_ignores_non_ascii() {
        let gsi = make_gsi_block(b"STL25.01", b"00", b"Caf\xE9", b"ZZ");
        let (info, _) = parse_gsi(&gsi).unwrap();
        assert_eq!(info.title, "Caf");
        assert_eq!(info.language, None);
    }

    #[test]
    fn test_parse_gsi_rejects_wrong_size() {
        assert!(matches!(
            parse_gsi(&[0u8; 100]),
            Err(StlError::InvalidGsiLength { len: 100 })
        ));
        assert!(parse_gsi(&vec![b' '; 1025]).is_err());
    }
}
