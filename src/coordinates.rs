//! # Item Coordinates
//!
//! Parsed identifiers for requested volumes, optionally scoped to pages.
//!
//! Identifier lists are `|`-separated. A page id carries its sequences in
//! brackets: `inu.30000011693409[1,2,17]|uc2.ark:/13960/t0ht2h[3]`.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Opening mark of a page sequence list
pub const PAGE_SEQ_START_MARK: char = '[';

/// Closing mark of a page sequence list
pub const PAGE_SEQ_END_MARK: char = ']';

/// Separator between identifiers
pub const ID_SEPARATOR: char = '|';

/// Parse errors for identifier lists
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty identifier list")]
    Empty,

    #[error("Malformed identifier: {0}")]
    MalformedId(String),

    #[error("Invalid page sequence '{sequence}' in {id}")]
    InvalidPageSequence { id: String, sequence: String },

    #[error("Page sequences not allowed in volume id: {0}")]
    UnexpectedPageSequences(String),
}

/// One requested volume, optionally restricted to specific pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemCoordinates {
    volume_id: String,
    page_sequences: Vec<u32>,
}

impl ItemCoordinates {
    /// Coordinates for a whole volume
    pub fn volume(volume_id: impl Into<String>) -> Self {
        Self {
            volume_id: volume_id.into(),
            page_sequences: Vec::new(),
        }
    }

    /// Coordinates for specific pages of a volume, in request order
    pub fn pages(volume_id: impl Into<String>, page_sequences: Vec<u32>) -> Self {
        Self {
            volume_id: volume_id.into(),
            page_sequences,
        }
    }

    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    pub fn page_sequences(&self) -> &[u32] {
        &self.page_sequences
    }

    /// True if no pages were named (the whole volume is requested)
    pub fn is_whole_volume(&self) -> bool {
        self.page_sequences.is_empty()
    }
}

impl fmt::Display for ItemCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.volume_id)?;
        if !self.page_sequences.is_empty() {
            let seqs: Vec<String> = self.page_sequences.iter().map(|s| s.to_string()).collect();
            write!(f, "{}{}{}", PAGE_SEQ_START_MARK, seqs.join(","), PAGE_SEQ_END_MARK)?;
        }
        Ok(())
    }
}

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([^\[\]|,\s]+)(?:\[([^\[\]]*)\])?$").expect("identifier pattern is valid")
    })
}

/// Parse a `|`-separated list of page ids.
///
/// An id without a bracketed list requests the whole volume.
pub fn parse_page_ids(input: &str) -> Result<Vec<ItemCoordinates>, ParseError> {
    parse_ids(input, true)
}

/// Parse a `|`-separated list of volume ids. Bracketed page lists are rejected.
pub fn parse_volume_ids(input: &str) -> Result<Vec<ItemCoordinates>, ParseError> {
    parse_ids(input, false)
}

fn parse_ids(input: &str, allow_pages: bool) -> Result<Vec<ItemCoordinates>, ParseError> {
    let mut result = Vec::new();

    for raw in input.split(ID_SEPARATOR) {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let captures = id_pattern()
            .captures(raw)
            .ok_or_else(|| ParseError::MalformedId(raw.to_string()))?;

        let volume_id = captures[1].to_string();

        match captures.get(2) {
            None => result.push(ItemCoordinates::volume(volume_id)),
            Some(_) if !allow_pages => {
                return Err(ParseError::UnexpectedPageSequences(raw.to_string()))
            }
            Some(list) => {
                let sequences = parse_sequences(raw, list.as_str())?;
                result.push(ItemCoordinates::pages(volume_id, sequences));
            }
        }
    }

    if result.is_empty() {
        return Err(ParseError::Empty);
    }

    Ok(result)
}

fn parse_sequences(id: &str, list: &str) -> Result<Vec<u32>, ParseError> {
    let mut sequences = Vec::new();
    for part in list.split(',') {
        let part = part.trim();
        let invalid = || ParseError::InvalidPageSequence {
            id: id.to_string(),
            sequence: part.to_string(),
        };
        let value: u32 = part.parse().map_err(|_| invalid())?;
        if value == 0 {
            return Err(invalid());
        }
        sequences.push(value);
    }
    Ok(sequences)
}

/// Content name of a page: its sequence, zero-padded to eight digits
pub fn page_sequence_name(sequence: u32) -> String {
    format!("{:08}", sequence)
}

/// Make a volume id safe to use as one path segment.
///
/// `:` becomes `+` and `/` becomes `=`.
pub fn clean_volume_id(volume_id: &str) -> String {
    volume_id
        .chars()
        .map(|c| match c {
            ':' => '+',
            '/' => '=',
            c => c,
        })
        .collect()
}
