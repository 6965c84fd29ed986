//! # Record Framing
//!
//! Each record on disk:
//!
//! ```text
//! u64 LE  payload length
//! u32 LE  CRC-32 of the 8 length bytes
//! [u8]    payload
//! u32 LE  CRC-32 of the payload
//! ```
//!
//! Payload: `context_idxs, ques_idxs, context_char_idxs, ques_char_idxs,
//! y1, y2`, each as a `u32 LE` byte count followed by the raw
//! little-endian array (i32 indices, f32 labels), then the `i64 LE` id.

use flate2::Crc;

use crate::error::{KotaeError, Result};
use crate::types::EncodedFeature;

/// Bytes before the payload: length + length checksum.
pub const HEADER_LEN: usize = 12;
/// Bytes after the payload: payload checksum.
pub const FOOTER_LEN: usize = 4;

/// Field names in payload order.
pub const FIELDS: [&str; 6] = [
    "context_idxs",
    "ques_idxs",
    "context_char_idxs",
    "ques_char_idxs",
    "y1",
    "y2",
];

pub fn checksum(bytes: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(bytes);
    crc.sum()
}

/// Serialize a feature into one complete framed record.
pub fn encode_record(feature: &EncodedFeature) -> Vec<u8> {
    let payload = encode_payload(feature);
    let len = (payload.len() as u64).to_le_bytes();

    let mut record = Vec::with_capacity(HEADER_LEN + payload.len() + FOOTER_LEN);
    record.extend_from_slice(&len);
    record.extend_from_slice(&checksum(&len).to_le_bytes());
    record.extend_from_slice(&payload);
    record.extend_from_slice(&checksum(&payload).to_le_bytes());
    record
}

fn encode_payload(feature: &EncodedFeature) -> Vec<u8> {
    let mut out = Vec::new();
    for field in [
        &feature.context_idxs,
        &feature.ques_idxs,
        &feature.context_char_idxs,
        &feature.ques_char_idxs,
    ] {
        put_blob(&mut out, field.iter().flat_map(|v| v.to_le_bytes()), field.len());
    }
    for field in [&feature.y1, &feature.y2] {
        put_blob(&mut out, field.iter().flat_map(|v| v.to_le_bytes()), field.len());
    }
    out.extend_from_slice(&(feature.id as i64).to_le_bytes());
    out
}

fn put_blob(out: &mut Vec<u8>, bytes: impl Iterator<Item = u8>, elements: usize) {
    out.extend_from_slice(&((elements * 4) as u32).to_le_bytes());
    out.extend(bytes);
}

/// Parse a record header, returning the payload length.
pub fn decode_header(header: &[u8; HEADER_LEN]) -> Result<usize> {
    let mut len = [0u8; 8];
    let mut crc = [0u8; 4];
    len.copy_from_slice(&header[..8]);
    crc.copy_from_slice(&header[8..]);
    if checksum(&len) != u32::from_le_bytes(crc) {
        return Err(KotaeError::RecordFormat("length checksum mismatch".into()));
    }
    let len = u64::from_le_bytes(len);
    usize::try_from(len).map_err(|_| KotaeError::RecordFormat(format!("payload length {len} too large")))
}

/// Verify and parse a payload with its trailing checksum.
pub fn decode_payload(payload: &[u8], footer: &[u8; FOOTER_LEN]) -> Result<EncodedFeature> {
    if checksum(payload) != u32::from_le_bytes(*footer) {
        return Err(KotaeError::RecordFormat("payload checksum mismatch".into()));
    }

    let mut cursor = Cursor { bytes: payload };
    let context_idxs = cursor.ints(FIELDS[0])?;
    let ques_idxs = cursor.ints(FIELDS[1])?;
    let context_char_idxs = cursor.ints(FIELDS[2])?;
    let ques_char_idxs = cursor.ints(FIELDS[3])?;
    let y1 = cursor.floats(FIELDS[4])?;
    let y2 = cursor.floats(FIELDS[5])?;
    let id = i64::from_le_bytes(cursor.array::<8>("id")?);

    if !cursor.bytes.is_empty() {
        return Err(KotaeError::RecordFormat(format!(
            "{} trailing payload bytes",
            cursor.bytes.len()
        )));
    }
    let id = u64::try_from(id).map_err(|_| KotaeError::RecordFormat(format!("negative id {id}")))?;

    Ok(EncodedFeature {
        context_idxs,
        ques_idxs,
        context_char_idxs,
        ques_char_idxs,
        y1,
        y2,
        id,
    })
}

struct Cursor<'a> {
    bytes: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn take(&mut self, n: usize, field: &str) -> Result<&'a [u8]> {
        if self.bytes.len() < n {
            return Err(KotaeError::RecordFormat(format!("payload ends inside {field}")));
        }
        let (head, tail) = self.bytes.split_at(n);
        self.bytes = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self, field: &str) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, field)?);
        Ok(out)
    }

    fn blob(&mut self, field: &str) -> Result<&'a [u8]> {
        let len = u32::from_le_bytes(self.array::<4>(field)?) as usize;
        if len % 4 != 0 {
            return Err(KotaeError::RecordFormat(format!(
                "{field} byte length {len} is not a multiple of 4"
            )));
        }
        self.take(len, field)
    }

    fn ints(&mut self, field: &str) -> Result<Vec<i32>> {
        Ok(self
            .blob(field)?
            .chunks_exact(4)
            .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    fn floats(&mut self, field: &str) -> Result<Vec<f32>> {
        Ok(self
            .blob(field)?
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature() -> EncodedFeature {
        EncodedFeature {
            context_idxs: vec![2, 3, 1, 0],
            ques_idxs: vec![4, 0],
            context_char_idxs: vec![5, 0, 6, 0, 0, 0, 0, 0],
            ques_char_idxs: vec![7, 0, 0, 0],
            y1: vec![0.0, 1.0, 0.0, 0.0],
            y2: vec![0.0, 0.0, 1.0, 0.0],
            id: 11,
        }
    }

    fn split(record: &[u8]) -> ([u8; HEADER_LEN], &[u8], [u8; FOOTER_LEN]) {
        let header: [u8; HEADER_LEN] = record[..HEADER_LEN].try_into().unwrap();
        let footer: [u8; FOOTER_LEN] = record[record.len() - FOOTER_LEN..].try_into().unwrap();
        (header, &record[HEADER_LEN..record.len() - FOOTER_LEN], footer)
    }

    #[test]
    fn record_layout() {
        let record = encode_record(&feature());
        let (header, payload, footer) = split(&record);
        let len = decode_header(&header).unwrap();
        assert_eq!(len, payload.len());
        // six length prefixes + 26 elements * 4 bytes + id
        assert_eq!(len, 6 * 4 + 26 * 4 + 8);
        assert_eq!(decode_payload(payload, &footer).unwrap(), feature());
    }

    #[test]
    fn raw_arrays_are_little_endian() {
        let record = encode_record(&feature());
        let (_, payload, _) = split(&record);
        assert_eq!(&payload[..4], &16u32.to_le_bytes());
        assert_eq!(&payload[4..8], &2i32.to_le_bytes());
        assert_eq!(&payload[payload.len() - 8..], &11i64.to_le_bytes());
    }

    #[test]
    fn corrupted_payload_detected() {
        let mut record = encode_record(&feature());
        record[HEADER_LEN + 5] ^= 0xff;
        let (_, payload, footer) = split(&record);
        let err = decode_payload(payload, &footer).unwrap_err();
        assert!(err.to_string().contains("checksum"));
    }

    #[test]
    fn corrupted_length_detected() {
        let mut record = encode_record(&feature());
        record[0] ^= 0x01;
        let (header, _, _) = split(&record);
        assert!(decode_header(&header).is_err());
    }
}
