//! # Record Writer
//!
//! Appends encoded features to a record store, one complete record per
//! write.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::prep::encoder::{Encoding, ExampleEncoder};
use crate::store::format::encode_record;
use crate::types::{EncodedFeature, Example, Meta};

/// Byte sink a [`RecordWriter`] can cut back after a failed append.
pub trait RecordSink: Write + Seek {
    /// Shrink the sink to `len` bytes.
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Persist buffered bytes to durable storage.
    fn sync(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl RecordSink for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

/// Append-only writer over a record store.
#[derive(Debug)]
pub struct RecordWriter<W = File> {
    sink: W,
    committed: u64,
    records: usize,
}

impl RecordWriter {
    /// Create or truncate the store at `path`.
    pub fn create(path: &Path) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: RecordSink> RecordWriter<W> {
    /// Write records to `sink`, starting at its current end.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            committed: 0,
            records: 0,
        }
    }

    /// Append one record.
    ///
    /// On failure the sink is cut back to the end of the last complete
    /// record, so the store never ends in a partial record.
    pub fn append(&mut self, feature: &EncodedFeature) -> Result<()> {
        let record = encode_record(feature);
        if let Err(err) = self.sink.write_all(&record) {
            warn!(error = %err, records = self.records, "Append failed, rolling back");
            self.sink.truncate(self.committed)?;
            self.sink.seek(SeekFrom::Start(self.committed))?;
            return Err(err.into());
        }
        self.committed += record.len() as u64;
        self.records += 1;
        Ok(())
    }

    /// Records appended so far.
    pub fn records(&self) -> usize {
        self.records
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Flush and close. Returns the number of records written.
    pub fn finish(mut self) -> Result<usize> {
        self.sink.sync()?;
        Ok(self.records)
    }
}

/// Encode `examples` and persist the kept ones to `path`.
///
/// Filtered examples are skipped but still counted in [`Meta::total`].
pub fn build_features<'e, I>(examples: I, encoder: &ExampleEncoder<'_>, path: &Path) -> Result<Meta>
where
    I: IntoIterator<Item = &'e Example>,
{
    let mut writer = RecordWriter::create(path)?;
    let mut meta = Meta::default();
    let mut filtered: BTreeMap<String, usize> = BTreeMap::new();

    for example in examples {
        meta.total += 1;
        match encoder.encode(example) {
            Encoding::Kept(feature) => writer.append(&feature)?,
            Encoding::Filtered(reason) => {
                debug!(id = example.id, %reason, "Filtered example");
                *filtered.entry(reason.to_string()).or_default() += 1;
            }
        }
    }

    let kept = writer.finish()?;
    info!(
        path = %path.display(),
        total = meta.total,
        kept,
        ?filtered,
        "Wrote record store"
    );
    Ok(meta)
}
