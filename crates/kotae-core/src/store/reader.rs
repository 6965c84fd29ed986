//! # Record Reader
//!
//! Sequential reader for record stores written by
//! [`RecordWriter`](crate::store::RecordWriter).

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use crate::config::Limits;
use crate::error::{KotaeError, Result};
use crate::store::format::{FOOTER_LEN, HEADER_LEN, decode_header, decode_payload};
use crate::types::EncodedFeature;

/// Iterator over the records of a store.
///
/// Yields an error (and then stops) on a truncated or corrupt record.
pub struct RecordReader<R = BufReader<File>> {
    inner: R,
    failed: bool,
}

impl RecordReader {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            failed: false,
        }
    }

    fn read_record(&mut self) -> Result<Option<EncodedFeature>> {
        if self.inner.fill_buf()?.is_empty() {
            return Ok(None);
        }

        let mut header = [0u8; HEADER_LEN];
        read_exact(&mut self.inner, &mut header, "header")?;
        let len = decode_header(&header)?;

        let mut payload = vec![0u8; len];
        read_exact(&mut self.inner, &mut payload, "payload")?;
        let mut footer = [0u8; FOOTER_LEN];
        read_exact(&mut self.inner, &mut footer, "checksum")?;

        decode_payload(&payload, &footer).map(Some)
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<EncodedFeature>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.read_record() {
            Ok(record) => record.map(Ok),
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

fn read_exact<R: Read>(reader: &mut R, buf: &mut [u8], part: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|err| match err.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            KotaeError::RecordFormat(format!("store ends inside a record {part}"))
        }
        _ => KotaeError::Io(err),
    })
}

/// Check a decoded record against the limits it was written with.
///
/// `char_row_width` is `char_limit` for character grids and 1 when the
/// char inputs reuse word indices.
pub fn check_shape(feature: &EncodedFeature, limits: &Limits, char_row_width: usize) -> Result<()> {
    let expected = [
        ("context_idxs", feature.context_idxs.len(), limits.para),
        ("ques_idxs", feature.ques_idxs.len(), limits.ques),
        (
            "context_char_idxs",
            feature.context_char_idxs.len(),
            limits.para * char_row_width,
        ),
        (
            "ques_char_idxs",
            feature.ques_char_idxs.len(),
            limits.ques * char_row_width,
        ),
        ("y1", feature.y1.len(), limits.para),
        ("y2", feature.y2.len(), limits.para),
    ];
    for (field, actual, expected) in expected {
        if actual != expected {
            return Err(KotaeError::ShapeMismatch {
                field,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::writer::RecordWriter;

    fn feature(id: u64) -> EncodedFeature {
        EncodedFeature {
            context_idxs: vec![2, 3, 0],
            ques_idxs: vec![4, 0],
            context_char_idxs: vec![5, 6, 0],
            ques_char_idxs: vec![7, 0],
            y1: vec![1.0, 0.0, 0.0],
            y2: vec![0.0, 1.0, 0.0],
            id,
        }
    }

    fn limits() -> Limits {
        Limits {
            para: 3,
            ques: 2,
            ans: 1,
            char: 4,
        }
    }

    fn write_store(path: &Path, n: u64) {
        let mut writer = RecordWriter::create(path).unwrap();
        for id in 1..=n {
            writer.append(&feature(id)).unwrap();
        }
        assert_eq!(writer.finish().unwrap(), n as usize);
    }

    #[test]
    fn reads_back_in_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.records");
        write_store(&path, 3);

        let records: Vec<EncodedFeature> = RecordReader::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records, vec![feature(1), feature(2), feature(3)]);
    }

    #[test]
    fn empty_store_yields_nothing() {
        let reader = RecordReader::new(&b""[..]);
        assert_eq!(reader.count(), 0);
    }

    #[test]
    fn truncated_tail_is_reported_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("b.records");
        write_store(&path, 2);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 3]).unwrap();

        let results: Vec<_> = RecordReader::open(&path).unwrap().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        let err = results[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("ends inside"));
    }

    #[test]
    fn shape_check_word_fallback() {
        assert!(check_shape(&feature(1), &limits(), 1).is_ok());
    }

    #[test]
    fn shape_check_reports_field() {
        let err = check_shape(&feature(1), &limits(), 4).unwrap_err();
        match err {
            KotaeError::ShapeMismatch {
                field,
                expected,
                actual,
            } => {
                assert_eq!(field, "context_char_idxs");
                assert_eq!(expected, 12);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
