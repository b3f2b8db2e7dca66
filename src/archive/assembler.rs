//! Archive assembler
//!
//! Drains a [`VolumeRetriever`] into a streaming zip archive. Failed volumes
//! are logged and collected, never aborting the archive; the collected
//! failures are written as a trailing `ERROR.err` entry.

use std::collections::HashSet;
use std::io::{self, Seek, Write};
use std::sync::Arc;

use chrono::{Datelike, Local, Timelike};
use serde::{Deserialize, Serialize};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::errors::{ArchiveError, ArchiveResult};
use crate::coordinates::clean_volume_id;
use crate::errors::AccessError;
use crate::observability::{AuditRecord, Auditor, Logger};
use crate::retrieval::{ContentReader, VolumeReader, VolumeRetriever};

/// Name of the single content entry of a concatenated archive
pub const CONCATENATED_ENTRY_NAME: &str = "wordseq.txt";

/// Name of the trailing error entry
pub const ERROR_ENTRY_NAME: &str = "ERROR.err";

const PAGE_ENTRY_EXTENSION: &str = "txt";

/// How retrieved content is laid out in the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackingStrategy {
    /// Every page of every volume, back to back, in one entry
    Concatenated,
    /// One entry per page and per metadata document, grouped by volume
    Separated,
}

impl PackingStrategy {
    /// Strategy selected by the `concat` request flag
    pub fn from_concat(concat: bool) -> Self {
        if concat {
            PackingStrategy::Concatenated
        } else {
            PackingStrategy::Separated
        }
    }
}

/// Failures collected during one assembly run, in retrieval order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorAccumulator {
    errors: Vec<AccessError>,
}

impl ErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: AccessError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[AccessError] {
        &self.errors
    }

    /// Body of the error entry: one `<Kind>: <message>` line per failure
    pub fn render(&self) -> String {
        self.errors
            .iter()
            .map(|e| format!("{}: {}\n", e.kind(), e))
            .collect()
    }

    fn into_errors(self) -> Vec<AccessError> {
        self.errors
    }
}

/// Outcome of a completed assembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyReport {
    pub volumes_written: usize,
    pub entries_written: usize,
    pub audit_records: usize,
    pub bytes_written: u64,
    pub errors: Vec<AccessError>,
}

/// Content names released for the current contiguous run of one volume
#[derive(Debug, Default)]
struct AuditRun {
    volume_id: Option<String>,
    content_names: Vec<String>,
}

impl AuditRun {
    /// Start a run for `volume_id`, returning the finished one if the id changed
    fn switch_to(&mut self, volume_id: &str) -> Option<AuditRecord> {
        if self.volume_id.as_deref() == Some(volume_id) {
            return None;
        }
        let finished = self.take();
        self.volume_id = Some(volume_id.to_string());
        finished
    }

    fn record(&mut self, content_name: &str) {
        self.content_names.push(content_name.to_string());
    }

    fn take(&mut self) -> Option<AuditRecord> {
        let volume_id = self.volume_id.take()?;
        let names = std::mem::take(&mut self.content_names);
        Some(AuditRecord::accessed(volume_id, names))
    }
}

/// Counts bytes handed to the sink
struct CountingWriter<'a, W> {
    inner: W,
    written: &'a mut u64,
}

impl<W: Write> Write for CountingWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        *self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Stored-entry zip writer that never repeats an entry name
struct EntryWriter<S: Write + Seek> {
    zip: ZipWriter<S>,
    options: SimpleFileOptions,
    names: HashSet<String>,
}

impl<S: Write + Seek> EntryWriter<S> {
    fn new(zip: ZipWriter<S>) -> Self {
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .last_modified_time(entry_timestamp());
        Self {
            zip,
            options,
            names: HashSet::new(),
        }
    }

    /// Start an entry, closing the previous one. A name already used in
    /// this archive gets a `-2`, `-3`, ... suffix before its extension.
    fn start(&mut self, name: &str) -> ArchiveResult<()> {
        let entry_name = self.claim(name);
        if entry_name != name {
            Logger::warn(
                "ENTRY_RENAMED",
                &[("requested", name), ("entry", entry_name.as_str())],
            );
        }
        self.zip
            .start_file(entry_name.as_str(), self.options)
            .map_err(|e| ArchiveError::zip_error(format!("failed to start entry {entry_name}"), e))
    }

    fn write(&mut self, content: &[u8]) -> ArchiveResult<()> {
        self.zip
            .write_all(content)
            .map_err(|e| ArchiveError::zip_error("failed to write entry content", e.into()))
    }

    fn entry_count(&self) -> usize {
        self.names.len()
    }

    fn finish(self) -> ArchiveResult<()> {
        let mut sink = self
            .zip
            .finish()
            .map_err(|e| ArchiveError::zip_error("failed to finish archive", e))?;
        sink.flush()
            .map_err(|e| ArchiveError::zip_error("failed to flush archive", e.into()))
    }

    fn claim(&mut self, name: &str) -> String {
        if self.names.insert(name.to_string()) {
            return name.to_string();
        }
        let (stem, extension) = split_extension(name);
        let mut n = 2;
        loop {
            let candidate = format!("{stem}-{n}{extension}");
            if self.names.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Split `dir/name.ext` into `dir/name` and `.ext`
fn split_extension(name: &str) -> (&str, &str) {
    let file_start = name.rfind('/').map_or(0, |i| i + 1);
    match name[file_start..].rfind('.') {
        None | Some(0) => (name, ""),
        Some(dot) => name.split_at(file_start + dot),
    }
}

fn entry_timestamp() -> DateTime {
    let now = Local::now();
    u16::try_from(now.year())
        .ok()
        .and_then(|year| {
            DateTime::from_date_and_time(
                year,
                now.month() as u8,
                now.day() as u8,
                now.hour() as u8,
                now.minute() as u8,
                now.second() as u8,
            )
            .ok()
        })
        .unwrap_or_default()
}

/// Streams retrieved volumes into a zip archive
pub struct ArchiveAssembler {
    strategy: PackingStrategy,
    auditor: Arc<dyn Auditor>,
}

impl ArchiveAssembler {
    pub fn new(strategy: PackingStrategy, auditor: Arc<dyn Auditor>) -> Self {
        Self { strategy, auditor }
    }

    pub fn strategy(&self) -> PackingStrategy {
        self.strategy
    }

    /// Write every volume the retriever yields to `sink` as a zip archive.
    ///
    /// The sink is written strictly forward, so it need not be seekable.
    /// Only sink and encoder failures are returned as errors; volume
    /// failures end up in the report and in the trailing error entry.
    pub fn assemble<W: Write>(
        &self,
        sink: W,
        retriever: &mut dyn VolumeRetriever,
    ) -> ArchiveResult<AssemblyReport> {
        let mut bytes_written = 0;
        let counting = CountingWriter {
            inner: sink,
            written: &mut bytes_written,
        };
        let mut zip = EntryWriter::new(ZipWriter::new_stream(counting));
        let mut accumulator = ErrorAccumulator::new();
        let mut run = AuditRun::default();
        let mut volumes_written = 0;
        let mut audit_records = 0;

        if self.strategy == PackingStrategy::Concatenated {
            zip.start(CONCATENATED_ENTRY_NAME)?;
        }

        while retriever.has_more_volumes() {
            let volume = match retriever.next_volume() {
                Ok(volume) => volume,
                Err(err) => {
                    let token = err.token().unwrap_or("").to_string();
                    let message = err.to_string();
                    Logger::error(
                        "VOLUME_RETRIEVAL_FAILED",
                        &[
                            ("kind", err.kind()),
                            ("code", err.code()),
                            ("token", token.as_str()),
                            ("message", message.as_str()),
                        ],
                    );
                    accumulator.push(err);
                    continue;
                }
            };

            if let Some(record) = run.switch_to(volume.volume_id()) {
                audit_records += self.flush_audit(&record);
            }
            self.write_volume(&mut zip, volume, &mut run)?;
            volumes_written += 1;
        }

        if let Some(record) = run.take() {
            audit_records += self.flush_audit(&record);
        }

        if !accumulator.is_empty() {
            zip.start(ERROR_ENTRY_NAME)?;
            zip.write(accumulator.render().as_bytes())?;
        }

        let entries_written = zip.entry_count();
        zip.finish()?;

        let volumes = volumes_written.to_string();
        let failures = accumulator.len().to_string();
        let entries = entries_written.to_string();
        Logger::info(
            "ARCHIVE_COMPLETE",
            &[
                ("strategy", self.strategy_label()),
                ("volumes", volumes.as_str()),
                ("failures", failures.as_str()),
                ("entries", entries.as_str()),
            ],
        );

        Ok(AssemblyReport {
            volumes_written,
            entries_written,
            audit_records,
            bytes_written,
            errors: accumulator.into_errors(),
        })
    }

    fn write_volume<S: Write + Seek>(
        &self,
        zip: &mut EntryWriter<S>,
        mut volume: VolumeReader,
        run: &mut AuditRun,
    ) -> ArchiveResult<()> {
        match self.strategy {
            PackingStrategy::Concatenated => {
                while let Some(page) = volume.next_page() {
                    zip.write(page.content())?;
                    run.record(page.content_name());
                }
            }
            PackingStrategy::Separated => {
                let dir = clean_volume_id(volume.volume_id());
                while let Some(page) = volume.next_page() {
                    let name = format!(
                        "{}/{}.{}",
                        dir,
                        page.content_name(),
                        PAGE_ENTRY_EXTENSION
                    );
                    write_entry(zip, &name, &page)?;
                    run.record(page.content_name());
                }
                for unit in volume.take_metadata() {
                    let name = format!("{}/{}", dir, unit.content_name());
                    write_entry(zip, &name, &unit)?;
                    run.record(unit.content_name());
                }
            }
        }
        Ok(())
    }

    /// Append one record; a failing auditor is logged and does not stop the archive
    fn flush_audit(&self, record: &AuditRecord) -> usize {
        match self.auditor.audit(record) {
            Ok(()) => 1,
            Err(e) => {
                let reason = e.to_string();
                Logger::error(
                    "AUDIT_FAILED",
                    &[
                        ("volume_id", record.volume_id.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
                0
            }
        }
    }

    fn strategy_label(&self) -> &'static str {
        match self.strategy {
            PackingStrategy::Concatenated => "concatenated",
            PackingStrategy::Separated => "separated",
        }
    }
}

fn write_entry<S: Write + Seek>(
    zip: &mut EntryWriter<S>,
    name: &str,
    content: &ContentReader,
) -> ArchiveResult<()> {
    zip.start(name)?;
    zip.write(content.content())
}
