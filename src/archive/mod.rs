//! # Archive Assembly
//!
//! Streams retrieved volumes to an output sink as a zip archive.
//!
//! # Layout
//!
//! - Concatenated: a single `wordseq.txt` holding every page back to back
//! - Separated: `<clean id>/<sequence>.txt` per page and
//!   `<clean id>/<name>` per metadata document
//!
//! Either layout ends with an `ERROR.err` entry when any volume failed.
//! Memory use is bounded by one volume's content. Entries are stored
//! uncompressed and written through `zip`'s streaming writer, so the sink
//! need not be seekable.

mod assembler;
mod errors;

pub use assembler::{
    ArchiveAssembler, AssemblyReport, ErrorAccumulator, PackingStrategy, CONCATENATED_ENTRY_NAME,
    ERROR_ENTRY_NAME,
};
pub use errors::{ArchiveError, ArchiveErrorCode, ArchiveResult, Severity};
