//! # Volume and Content Readers

use std::collections::VecDeque;

/// A named byte payload: one page or one metadata document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReader {
    content_name: String,
    content: Vec<u8>,
}

impl ContentReader {
    pub fn new(content_name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            content_name: content_name.into(),
            content: content.into(),
        }
    }

    /// Page sequence name (`00000004`) or metadata label (`mets.xml`)
    pub fn content_name(&self) -> &str {
        &self.content_name
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn into_content(self) -> Vec<u8> {
        self.content
    }
}

/// Forward-only reader over one retrieved volume.
///
/// Pages are yielded in request order and each page is handed out once.
#[derive(Debug)]
pub struct VolumeReader {
    volume_id: String,
    pages: VecDeque<ContentReader>,
    metadata: Vec<ContentReader>,
}

impl VolumeReader {
    pub fn new(
        volume_id: impl Into<String>,
        pages: Vec<ContentReader>,
        metadata: Vec<ContentReader>,
    ) -> Self {
        Self {
            volume_id: volume_id.into(),
            pages: pages.into(),
            metadata,
        }
    }

    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    pub fn has_more_pages(&self) -> bool {
        !self.pages.is_empty()
    }

    /// Take the next page, if any
    pub fn next_page(&mut self) -> Option<ContentReader> {
        self.pages.pop_front()
    }

    /// Pages not yet consumed
    pub fn remaining_pages(&self) -> usize {
        self.pages.len()
    }

    /// Metadata documents of this volume
    pub fn metadata(&self) -> &[ContentReader] {
        &self.metadata
    }

    /// Take ownership of the metadata documents, leaving none behind
    pub fn take_metadata(&mut self) -> Vec<ContentReader> {
        std::mem::take(&mut self.metadata)
    }
}

impl Iterator for VolumeReader {
    type Item = ContentReader;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_page()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_are_forward_only() {
        let mut reader = VolumeReader::new(
            "vol",
            vec![ContentReader::new("00000001", "a"), ContentReader::new("00000002", "b")],
            vec![ContentReader::new("mets.xml", "<mets/>")],
        );

        assert!(reader.has_more_pages());
        assert_eq!(reader.next_page().unwrap().content(), b"a");
        assert_eq!(reader.remaining_pages(), 1);
        assert_eq!(reader.next_page().unwrap().content_name(), "00000002");
        assert!(!reader.has_more_pages());
        assert!(reader.next_page().is_none());
        assert_eq!(reader.metadata().len(), 1);
    }

    #[test]
    fn test_take_metadata_empties() {
        let mut reader =
            VolumeReader::new("vol", vec![], vec![ContentReader::new("mets.xml", "x")]);
        assert_eq!(reader.take_metadata().len(), 1);
        assert!(reader.metadata().is_empty());
    }
}
