// Teletext packet decoding (ETSI EN 300 706, level 1 only).
// Subtitle pages always use the default G0 set, so the only national
// substitution applied is 0x23 -> pound sign.

use crate::hamming::{hamming_16_decode, hamming_8_4_decode};

pub const PACKET_SIZE: usize = 42;
pub const HEADER_TEXT_SIZE: usize = 32;
pub const ROW_TEXT_SIZE: usize = 40;

// Control word bit carrying the C6 "subtitle" flag
pub const CONTROL_SUBTITLE: u16 = 0x40;

const MAX_ROW_PACKET: u8 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeletextPacket {
    Header {
        magazine: u8,
        page: u8,
        subpage: u16,
        control: u16,
        text: [u8; HEADER_TEXT_SIZE],
    },
    Row {
        magazine: u8,
        row: u8,
        data: [u8; ROW_TEXT_SIZE],
    },
    // Packets 26-31, not decoded further
    Enhancement {
        magazine: u8,
        packet: u8,
    },
}

impl TeletextPacket {
    pub fn magazine(&self) -> u8 {
        match self {
            Self::Header { magazine, .. } => *magazine,
            Self::Row { magazine, .. } => *magazine,
            Self::Enhancement { magazine, .. } => *magazine,
        }
    }

    pub fn packet_number(&self) -> u8 {
        match self {
            Self::Header { .. } => 0,
            Self::Row { row, .. } => *row,
            Self::Enhancement { packet, .. } => *packet,
        }
    }

    pub fn is_subtitle_page(&self) -> bool {
        matches!(self, Self::Header { control, .. } if control & CONTROL_SUBTITLE != 0)
    }

    /// Display text of a header or row, control codes shown as `⟦XX⟧`.
    pub fn display_text(&self) -> Option<String> {
        match self {
            Self::Header { text, .. } => Some(render_text(text)),
            Self::Row { data, .. } => Some(render_text(data)),
            Self::Enhancement { .. } => None,
        }
    }
}

// Magazine and packet number from the two address bytes
pub fn decode_address(b0: u8, b1: u8) -> (u8, u8) {
    let (low, _) = hamming_8_4_decode(b0);
    let (high, _) = hamming_8_4_decode(b1);

    let mut magazine = low & 0x7;
    if magazine == 0 {
        magazine = 8;
    }
    let packet = (low >> 3) | (high << 1);

    (magazine, packet)
}

pub fn decode_packet(data: &[u8; PACKET_SIZE]) -> TeletextPacket {
    let (magazine, packet) = decode_address(data[0], data[1]);

    if packet == 0 {
        return decode_header(magazine, data);
    }

    if packet <= MAX_ROW_PACKET {
        let mut row = [0u8; ROW_TEXT_SIZE];
        row.copy_from_slice(&data[2..PACKET_SIZE]);
        return TeletextPacket::Row {
            magazine,
            row: packet,
            data: row,
        };
    }

    TeletextPacket::Enhancement { magazine, packet }
}

fn decode_header(magazine: u8, data: &[u8; PACKET_SIZE]) -> TeletextPacket {
    let nibble = |i: usize| hamming_8_4_decode(data[i]).0 as u16;

    let page = hamming_16_decode(data[2], data[3]);

    let mut subpage = nibble(4);
    let mut control: u16 = 0;

    let n5 = nibble(5);
    subpage |= (n5 & 0x7) << 4;
    control |= (n5 & 0x8) << 1;

    subpage |= nibble(6) << 8;

    let n7 = nibble(7);
    subpage |= (n7 & 0x3) << 12;
    control |= (n7 & 0xC) << 3;

    control |= nibble(8) << 7;
    control |= nibble(9) << 11;

    let mut text = [0u8; HEADER_TEXT_SIZE];
    text.copy_from_slice(&data[10..PACKET_SIZE]);

    TeletextPacket::Header {
        magazine,
        page,
        subpage,
        control,
        text,
    }
}

pub fn strip_parity(byte: u8) -> u8 {
    byte & 0x7F
}

// Printable teletext character for a parity-stripped byte >= 0x20
pub fn teletext_char(byte: u8) -> char {
    match byte {
        0x23 => '£',
        b => b as char,
    }
}

pub fn render_text(bytes: &[u8]) -> String {
    let mut text = String::with_capacity(bytes.len());
    for &raw in bytes {
        let byte = strip_parity(raw);
        if byte < 0x20 {
            text.push_str(&format!("⟦{:02X}⟧", byte));
        } else {
            text.push(teletext_char(byte));
        }
    }
    text
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::hamming::hamming_8_4_encode;

    // Odd parity in bit 7, as transmitted
    pub fn with_parity(byte: u8) -> u8 {
        let b = byte & 0x7F;
        if b.count_ones() % 2 == 0 {
            b | 0x80
        } else {
            b
        }
    }

    pub fn address(magazine: u8, packet: u8) -> [u8; 2] {
        let mag = magazine & 0x7;
        [
            hamming_8_4_encode(mag | ((packet & 0x1) << 3)),
            hamming_8_4_encode(packet >> 1),
        ]
    }

    pub fn header_packet(magazine: u8, page: u8, subtitle: bool) -> [u8; PACKET_SIZE] {
        let mut packet = [0u8; PACKET_SIZE];
        packet[..2].copy_from_slice(&address(magazine, 0));
        packet[2] = hamming_8_4_encode(page & 0xF);
        packet[3] = hamming_8_4_encode(page >> 4);
        for i in 4..10 {
            packet[i] = hamming_8_4_encode(0);
        }
        if subtitle {
            // C6 lives in bit 3 of the byte-7 nibble
            packet[7] = hamming_8_4_encode(0x8);
        }
        for i in 10..PACKET_SIZE {
            packet[i] = with_parity(b' ');
        }
        packet
    }

    pub fn row_packet(magazine: u8, row: u8, content: &[u8]) -> [u8; PACKET_SIZE] {
        let mut packet = [0u8; PACKET_SIZE];
        packet[..2].copy_from_slice(&address(magazine, row));
        for i in 2..PACKET_SIZE {
            packet[i] = with_parity(b' ');
        }
        for (i, &b) in content.iter().take(ROW_TEXT_SIZE).enumerate() {
            packet[2 + i] = with_parity(b);
        }
        packet
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::hamming::hamming_8_4_encode;

    #[test]
    fn test_address_decoding() {
        for magazine in 1..=8u8 {
            for packet in [0u8, 1, 20, 25, 26, 31] {
                let addr = address(magazine, packet);
                assert_eq!(decode_address(addr[0], addr[1]), (magazine, packet));
            }
        }
    }

    #[test]
    fn test_magazine_zero_is_eight() {
        let addr = address(0, 3);
        assert_eq!(decode_address(addr[0], addr[1]), (8, 3));
    }

    #[test]
    fn test_header_decoding() {
        let mut packet = header_packet(8, 0x88, true);
        packet[10..14].copy_from_slice(&[with_parity(b'P'), with_parity(b'8'), 0x0D, with_parity(0x23)]);

        match decode_packet(&packet) {
            TeletextPacket::Header {
                magazine,
                page,
                subpage,
                control,
                ..
            } => {
                assert_eq!(magazine, 8);
                assert_eq!(page, 0x88);
                assert_eq!(subpage, 0);
                assert_eq!(control, CONTROL_SUBTITLE);
            }
            other => panic!("expected header, got {:?}", other),
        }

        let decoded = decode_packet(&packet);
        assert!(decoded.is_subtitle_page());
        let text = decoded.display_text().unwrap();
        assert!(text.starts_with("P8⟦0D⟧£"));
        assert_eq!(text.chars().count(), 32 - 1 + 4);
    }

    #[test]
    fn test_header_subpage_and_control_bits() {
        let mut packet = header_packet(1, 0x00, false);
        packet[4] = hamming_8_4_encode(0x3);
        packet[5] = hamming_8_4_encode(0x8 | 0x5); // C4 + subpage bits
        packet[6] = hamming_8_4_encode(0x2);
        packet[7] = hamming_8_4_encode(0x4 | 0x1); // C5 + subpage bits
        packet[8] = hamming_8_4_encode(0x1); // C7
        packet[9] = hamming_8_4_encode(0x1); // C11

        match decode_packet(&packet) {
            TeletextPacket::Header {
                subpage, control, ..
            } => {
                assert_eq!(subpage, 0x3 | (0x5 << 4) | (0x2 << 8) | (0x1 << 12));
                assert_eq!(control, 0x10 | 0x20 | 0x80 | 0x800);
                assert_eq!(control & CONTROL_SUBTITLE, 0);
            }
            other => panic!("expected header, got {:?}", other),
        }
    }

    #[test]
    fn test_row_decoding() {
        let packet = row_packet(1, 22, b"\x03Hello #1");
        let decoded = decode_packet(&packet);
        assert_eq!(decoded.magazine(), 1);
        assert_eq!(decoded.packet_number(), 22);
        assert!(!decoded.is_subtitle_page());

        let text = decoded.display_text().unwrap();
        assert!(text.starts_with("⟦03⟧Hello £1"));
    }

    #[test]
    fn test_enhancement_packets_not_decoded() {
        let mut packet = [0u8; PACKET_SIZE];
        packet[..2].copy_from_slice(&address(2, 27));
        let decoded = decode_packet(&packet);
        assert_eq!(
            decoded,
            TeletextPacket::Enhancement {
                magazine: 2,
                packet: 27
            }
        );
        assert_eq!(decoded.display_text(), None);
    }

    #[test]
    fn test_parity_strip() {
        assert_eq!(strip_parity(0xC1), 0x41);
        assert_eq!(render_text(&[0xC1, 0x80 | 0x07]), "A⟦07⟧");
    }
}
