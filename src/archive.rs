use std::collections::HashMap;
use std::io::{self, Read, Seek, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::domain::ArchiveEntry;
use crate::error::PackError;

/// Single-owner ZIP writer for one run.
///
/// ZIP members must have unique names, so entries are staged by name and
/// encoded on [`ArchiveWriter::finish`]. Adding a name twice replaces the
/// earlier bytes in place: the last write wins.
///
/// Every image body stays in memory until `finish`, whatever the sink is, so
/// peak memory grows with the total size of the successful downloads.
pub struct ArchiveWriter<W: Write + Seek> {
    sink: W,
    entries: Vec<ArchiveEntry>,
    positions: HashMap<String, usize>,
}

impl<W: Write + Seek> ArchiveWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            entries: Vec::new(),
            positions: HashMap::new(),
        }
    }

    /// Returns `true` when `name` replaced an earlier entry.
    pub fn add(&mut self, name: String, bytes: Vec<u8>) -> bool {
        if let Some(&position) = self.positions.get(&name) {
            tracing::warn!(entry = %name, "archive entry name collision, keeping the later image");
            self.entries[position].bytes = bytes;
            return true;
        }
        self.positions.insert(name.clone(), self.entries.len());
        self.entries.push(ArchiveEntry { name, bytes });
        false
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Encodes every staged entry and seals the container.
    pub fn finish(self) -> Result<W, PackError> {
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(self.sink);
        for entry in &self.entries {
            zip.start_file(entry.name.as_str(), options)
                .map_err(|err| PackError::Archive(format!("{}: {err}", entry.name)))?;
            zip.write_all(&entry.bytes)
                .map_err(|err| PackError::Archive(format!("{}: {err}", entry.name)))?;
        }
        zip.finish()
            .map_err(|err| PackError::Archive(err.to_string()))
    }
}

/// Reads every member of a finished archive back and returns the names in
/// stored order.
pub fn verify_archive<R: Read + Seek>(reader: R) -> Result<Vec<String>, PackError> {
    let mut archive = ZipArchive::new(reader).map_err(|err| PackError::Archive(err.to_string()))?;

    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|err| PackError::Archive(err.to_string()))?;
        if entry.is_dir() {
            continue;
        }
        io::copy(&mut entry, &mut io::sink())
            .map_err(|err| PackError::Archive(format!("{}: {err}", entry.name())))?;
        names.push(entry.name().to_string());
    }
    Ok(names)
}
