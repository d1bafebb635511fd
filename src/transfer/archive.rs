use std::io::{Cursor, Write};

use bytes::Bytes;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::grouping::SubfolderGroup;
use crate::error::ArchiveError;

pub const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

// Phase boundaries (percent of one build): read | compress | finalize
const READ_END: f64 = 60.0;
const COMPRESS_END: f64 = 80.0;

/// A finalized in-memory archive ready to hand to a transport.
#[derive(Clone, Debug)]
pub struct ArchiveArtifact {
    pub group_name: String,
    pub file_name: String,
    pub content_type: &'static str,
    /// Shared so retries and progress readers never copy the archive.
    pub bytes: Bytes,
    pub entries: usize,
}

impl ArchiveArtifact {
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// Entries at or past the 32-bit size limit need zip64 headers.
fn needs_zip64(len: u64) -> bool {
    len >= u32::MAX as u64
}

#[derive(Clone, Copy, Debug)]
pub struct ArchiveBuilder {
    compression_level: i64,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self { compression_level: 6 }
    }
}

impl ArchiveBuilder {
    pub fn new(compression_level: i64) -> Self {
        Self { compression_level: compression_level.clamp(1, 9) }
    }

    /// Build one deflate archive for `group`.
    ///
    /// Every source is read fully before anything is compressed, so a read
    /// failure leaves nothing behind. `on_progress` receives a non-decreasing
    /// percentage ending at 100 on success. An empty group is `Ok(None)`.
    pub fn build(
        &self,
        group: &SubfolderGroup,
        on_progress: &mut dyn FnMut(f64),
    ) -> Result<Option<ArchiveArtifact>, ArchiveError> {
        if group.files.is_empty() {
            return Ok(None);
        }
        let total = group.files.len();
        on_progress(0.0);

        let mut buffers: Vec<(String, Vec<u8>)> = Vec::with_capacity(total);
        for (i, f) in group.files.iter().enumerate() {
            let data = std::fs::read(&f.source)
                .map_err(|e| ArchiveError::ReadFailed(f.source.clone(), e.to_string()))?;
            buffers.push((group.entry_path(f), data));
            on_progress(READ_END * (i + 1) as f64 / total as f64);
        }

        let base = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(self.compression_level));
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let span = COMPRESS_END - READ_END;
        for (i, (name, data)) in buffers.iter().enumerate() {
            let options = base.large_file(needs_zip64(data.len() as u64));
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| ArchiveError::CompressFailed(name.clone(), e.to_string()))?;
            writer
                .write_all(data)
                .map_err(|e| ArchiveError::CompressFailed(name.clone(), e.to_string()))?;
            on_progress(READ_END + span * (i + 1) as f64 / total as f64);
        }
        drop(buffers);

        let bytes = writer
            .finish()
            .map_err(|e| ArchiveError::CompressFailed(format!("{}.zip", group.name), e.to_string()))?
            .into_inner();
        on_progress(100.0);
        tracing::info!(
            "archive {}.zip built: {} entries, {} bytes",
            group.name,
            total,
            bytes.len()
        );

        Ok(Some(ArchiveArtifact {
            group_name: group.name.clone(),
            file_name: format!("{}.zip", group.name),
            content_type: ARCHIVE_CONTENT_TYPE,
            bytes: Bytes::from(bytes),
            entries: total,
        }))
    }
}
