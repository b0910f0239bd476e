// Hamming 8/4 as used by teletext packet addresses and page headers.
// Data bits sit at positions 1, 3, 5, 7; protection bits at 0, 2, 4, 6.

pub const NO_ERROR: u8 = 0;
pub const CORRECTED: u8 = 1;
pub const UNCORRECTABLE: u8 = 2;

/// (nibble, error) for every possible input byte.
pub static HAMMING_8_4_TABLE: [(u8, u8); 256] = build_table();

const fn bit(value: u8, pos: u8) -> u8 {
    (value >> pos) & 1
}

/// Encodes a 4-bit value into its Hamming 8/4 codeword.
pub const fn hamming_8_4_encode(nibble: u8) -> u8 {
    let d1 = bit(nibble, 0);
    let d2 = bit(nibble, 1);
    let d3 = bit(nibble, 2);
    let d4 = bit(nibble, 3);

    let p1 = 1 ^ d1 ^ d3 ^ d4;
    let p2 = 1 ^ d1 ^ d2 ^ d4;
    let p3 = 1 ^ d1 ^ d2 ^ d3;
    // Odd parity across the whole byte
    let p4 = 1 ^ p1 ^ d1 ^ p2 ^ d2 ^ p3 ^ d3 ^ d4;

    p1 | (d1 << 1) | (p2 << 2) | (d2 << 3) | (p3 << 4) | (d3 << 5) | (p4 << 6) | (d4 << 7)
}

// Raw data bits, used as the best guess when a byte can't be corrected
const fn data_bits(byte: u8) -> u8 {
    bit(byte, 1) | (bit(byte, 3) << 1) | (bit(byte, 5) << 2) | (bit(byte, 7) << 3)
}

const fn build_table() -> [(u8, u8); 256] {
    let mut table = [(0u8, 0u8); 256];
    let mut index = 0;

    while index < 256 {
        let byte = index as u8;
        let mut entry = (data_bits(byte), UNCORRECTABLE);

        let mut nibble = 0u8;
        while nibble < 16 {
            match (byte ^ hamming_8_4_encode(nibble)).count_ones() {
                0 => entry = (nibble, NO_ERROR),
                1 => entry = (nibble, CORRECTED),
                _ => {}
            }
            nibble += 1;
        }

        table[index] = entry;
        index += 1;
    }

    table
}

/// Returns `(nibble, error)` where error is 0 (valid), 1 (single bit
/// corrected) or 2 (uncorrectable, nibble is a best-effort guess).
pub fn hamming_8_4_decode(byte: u8) -> (u8, u8) {
    HAMMING_8_4_TABLE[byte as usize]
}

/// Decodes two consecutive Hamming 8/4 bytes, low nibble first.
pub fn hamming_16_decode(low: u8, high: u8) -> u8 {
    (hamming_8_4_decode(high).0 << 4) | hamming_8_4_decode(low).0
}
