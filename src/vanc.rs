use log::{debug, info};

use crate::teletext::PACKET_SIZE;

// Clock run-in (0x55 0x55) + framing code (0x27)
pub const SYNC_PATTERN: [u8; 3] = [0x55, 0x55, 0x27];

// Only the start of the buffer is checked when detecting the format
const DETECTION_WINDOW: usize = 1000;

// A stream needs at least this many sync patterns to count as teletext
pub const MIN_SYNC_PATTERNS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketFormat {
    // OP-47/VANC, each packet preceded by the sync pattern
    Vanc,
    // Back-to-back 42-byte packets, no framing
    Raw,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedPacket {
    pub data: [u8; PACKET_SIZE],
    pub index: usize,
}

fn find_sync(data: &[u8], from: usize) -> Option<usize> {
    if from >= data.len() {
        return None;
    }
    data[from..]
        .windows(SYNC_PATTERN.len())
        .position(|window| window == SYNC_PATTERN)
        .map(|pos| from + pos)
}

pub fn detect_format(data: &[u8]) -> PacketFormat {
    let window = &data[..data.len().min(DETECTION_WINDOW)];
    if find_sync(window, 0).is_some() {
        PacketFormat::Vanc
    } else {
        PacketFormat::Raw
    }
}

pub fn count_sync_patterns(data: &[u8]) -> usize {
    // Non-overlapping, like a substring count
    let mut count = 0;
    let mut offset = 0;
    while let Some(pos) = find_sync(data, offset) {
        count += 1;
        offset = pos + SYNC_PATTERN.len();
    }
    count
}

pub fn extract_vanc_packets(data: &[u8]) -> Vec<IndexedPacket> {
    let mut packets = Vec::new();
    let mut offset = 0;

    while offset + SYNC_PATTERN.len() + PACKET_SIZE < data.len() {
        let Some(pos) = find_sync(data, offset) else {
            break;
        };

        let start = pos + SYNC_PATTERN.len();
        if start + PACKET_SIZE <= data.len() {
            let mut packet = [0u8; PACKET_SIZE];
            packet.copy_from_slice(&data[start..start + PACKET_SIZE]);
            packets.push(IndexedPacket {
                data: packet,
                index: packets.len(),
            });
        }

        offset = start + PACKET_SIZE;
    }

    debug!("Extracted {} VANC teletext packets", packets.len());
    packets
}

pub fn chunk_raw_packets(data: &[u8]) -> Vec<IndexedPacket> {
    data.chunks_exact(PACKET_SIZE)
        .enumerate()
        .map(|(index, chunk)| {
            let mut packet = [0u8; PACKET_SIZE];
            packet.copy_from_slice(chunk);
            IndexedPacket {
                data: packet,
                index,
            }
        })
        .collect()
}

pub fn extract_packets(data: &[u8]) -> Vec<IndexedPacket> {
    match detect_format(data) {
        PacketFormat::Vanc => {
            info!("Detected OP-47/VANC format, extracting teletext packets");
            let packets = extract_vanc_packets(data);
            info!("Extracted {} teletext packets", packets.len());
            packets
        }
        PacketFormat::Raw => {
            info!("No sync pattern found, processing as raw teletext");
            chunk_raw_packets(data)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(payloads: &[[u8; PACKET_SIZE]]) -> Vec<u8> {
        let mut data = Vec::new();
        for payload in payloads {
            data.extend_from_slice(&SYNC_PATTERN);
            data.extend_from_slice(payload);
        }
        data
    }

    #[test]
    fn test_extracts_packets_after_sync() {
        let mut data = vec![0xAA; 7];
        data.extend(framed(&[[1u8; PACKET_SIZE], [2u8; PACKET_SIZE]]));
        data.extend_from_slice(&[0u8; 4]);

        let packets = extract_vanc_packets(&data);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].data, [1u8; PACKET_SIZE]);
        assert_eq!(packets[0].index, 0);
        assert_eq!(packets[1].data, [2u8; PACKET_SIZE]);
        assert_eq!(packets[1].index, 1);
    }

    #[test]
    fn test_stops_when_too_few_bytes_remain() {
        // Last packet is exactly at the end, so fewer than 45 bytes remain
        // after the offset and it is not scanned
        let data = framed(&[[3u8; PACKET_SIZE], [4u8; PACKET_SIZE]]);
        let packets = extract_vanc_packets(&data);
        assert_eq!(packets.len(), 1);

        let mut padded = data.clone();
        padded.push(0);
        assert_eq!(extract_vanc_packets(&padded).len(), 2);
    }

    #[test]
    fn test_sync_inside_payload_is_consumed() {
        let mut payload = [9u8; PACKET_SIZE];
        payload[5..8].copy_from_slice(&SYNC_PATTERN);
        let mut data = framed(&[payload, [7u8; PACKET_SIZE]]);
        data.push(0);

        let packets = extract_vanc_packets(&data);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].data, [7u8; PACKET_SIZE]);
    }

    #[test]
    fn test_detect_format() {
        let data = framed(&[[0u8; PACKET_SIZE]]);
        assert_eq!(detect_format(&data), PacketFormat::Vanc);
        assert_eq!(detect_format(&[0u8; 84]), PacketFormat::Raw);

        // Sync beyond the detection window does not count
        let mut late = vec![0u8; 1200];
        late.extend(framed(&[[0u8; PACKET_SIZE]]));
        assert_eq!(detect_format(&late), PacketFormat::Raw);
    }

    #[test]
    fn test_chunk_raw_packets() {
        let mut data = vec![1u8; PACKET_SIZE];
        data.extend(vec![2u8; PACKET_SIZE]);
        data.extend(vec![3u8; 10]);

        let packets = chunk_raw_packets(&data);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].index, 1);
        assert_eq!(packets[1].data, [2u8; PACKET_SIZE]);
    }

    #[test]
    fn test_count_sync_patterns() {
        let data = framed(&[[0u8; PACKET_SIZE]; 12]);
        assert_eq!(count_sync_patterns(&data), 12);
        assert_eq!(count_sync_patterns(&[0x55, 0x55, 0x55, 0x27]), 1);
        assert_eq!(count_sync_patterns(&[]), 0);
    }
}
