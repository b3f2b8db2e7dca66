//! # Requested Pages
//!
//! The two ways a request names pages of a volume, behind one capability
//! so the quota arithmetic is written once.

use crate::coordinates::{ItemCoordinates, PAGE_SEQ_END_MARK, PAGE_SEQ_START_MARK};
use crate::store::VolumeInfo;

/// How requested ids are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// Every id denotes the entire volume; page lists are ignored
    WholeVolume,
    /// Ids carry explicit page lists; an empty list means the whole volume
    PartialPage,
}

/// Pages requested from one volume
pub trait RequestedPages {
    fn volume_id(&self) -> &str;

    /// Number of pages requested
    fn requested_page_count(&self) -> u64;

    /// Page sequence at position `idx` (`idx < requested_page_count()`)
    fn requested_page_at(&self, idx: u64) -> u32;

    /// First requested sequence beyond `page_count`, if any
    fn first_out_of_range(&self, page_count: u32) -> Option<u32> {
        (0..self.requested_page_count())
            .map(|idx| self.requested_page_at(idx))
            .find(|&seq| seq > page_count)
    }

    /// Token naming the page at `idx`, e.g. `vol[4]`; the bare volume id if nothing was requested
    fn token_for(&self, idx: u64) -> String {
        if self.requested_page_count() == 0 {
            return self.volume_id().to_string();
        }
        page_token(self.volume_id(), self.requested_page_at(idx))
    }
}

/// `<volume>[<sequence>]`
pub fn page_token(volume_id: &str, sequence: u32) -> String {
    format!(
        "{}{}{}{}",
        volume_id, PAGE_SEQ_START_MARK, sequence, PAGE_SEQ_END_MARK
    )
}

/// Index of the page reported when a running count exceeds its limit.
///
/// Returns `n - offset` clamped to `[0, n - 1]`, or 0 when `n` is 0.
pub fn clipped_index(n: u64, offset: i128) -> u64 {
    if n == 0 {
        return 0;
    }
    let raw = n as i128 - offset;
    raw.clamp(0, n as i128 - 1) as u64
}

/// All pages of a volume, sequences `1..=page_count`
#[derive(Debug, Clone, Copy)]
pub struct WholeVolume<'a> {
    volume_id: &'a str,
    page_count: u32,
}

impl<'a> WholeVolume<'a> {
    pub fn new(volume_id: &'a str, page_count: u32) -> Self {
        Self {
            volume_id,
            page_count,
        }
    }
}

impl RequestedPages for WholeVolume<'_> {
    fn volume_id(&self) -> &str {
        self.volume_id
    }

    fn requested_page_count(&self) -> u64 {
        self.page_count as u64
    }

    fn requested_page_at(&self, idx: u64) -> u32 {
        idx as u32 + 1
    }

    fn first_out_of_range(&self, _page_count: u32) -> Option<u32> {
        None
    }
}

/// An explicit list of page sequences, in request order
#[derive(Debug, Clone, Copy)]
pub struct PartialPages<'a> {
    volume_id: &'a str,
    sequences: &'a [u32],
}

impl<'a> PartialPages<'a> {
    pub fn new(volume_id: &'a str, sequences: &'a [u32]) -> Self {
        Self {
            volume_id,
            sequences,
        }
    }
}

impl RequestedPages for PartialPages<'_> {
    fn volume_id(&self) -> &str {
        self.volume_id
    }

    fn requested_page_count(&self) -> u64 {
        self.sequences.len() as u64
    }

    fn requested_page_at(&self, idx: u64) -> u32 {
        self.sequences[idx as usize]
    }
}

/// The requested pages of one coordinate, resolved against its volume info
#[derive(Debug, Clone, Copy)]
pub enum PageSelection<'a> {
    Whole(WholeVolume<'a>),
    Partial(PartialPages<'a>),
}

impl<'a> PageSelection<'a> {
    pub fn resolve(
        coordinates: &'a ItemCoordinates,
        info: &VolumeInfo,
        granularity: Granularity,
    ) -> Self {
        match granularity {
            Granularity::PartialPage if !coordinates.is_whole_volume() => PageSelection::Partial(
                PartialPages::new(coordinates.volume_id(), coordinates.page_sequences()),
            ),
            _ => PageSelection::Whole(WholeVolume::new(coordinates.volume_id(), info.page_count)),
        }
    }

    /// Requested sequences in order
    pub fn sequences(&self) -> Vec<u32> {
        (0..self.requested_page_count())
            .map(|idx| self.requested_page_at(idx))
            .collect()
    }

    fn inner(&self) -> &dyn RequestedPages {
        match self {
            PageSelection::Whole(pages) => pages as &dyn RequestedPages,
            PageSelection::Partial(pages) => pages as &dyn RequestedPages,
        }
    }
}

impl RequestedPages for PageSelection<'_> {
    fn volume_id(&self) -> &str {
        self.inner().volume_id()
    }

    fn requested_page_count(&self) -> u64 {
        self.inner().requested_page_count()
    }

    fn requested_page_at(&self, idx: u64) -> u32 {
        self.inner().requested_page_at(idx)
    }

    fn first_out_of_range(&self, page_count: u32) -> Option<u32> {
        self.inner().first_out_of_range(page_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipped_index_in_range() {
        // n - limit when that lands inside the list
        assert_eq!(clipped_index(8, 5), 3);
        assert_eq!(clipped_index(6, 5), 1);
    }

    #[test]
    fn test_clipped_index_clamps() {
        for n in 1..20u64 {
            for offset in -30..30i128 {
                let idx = clipped_index(n, offset);
                assert!(idx <= n - 1, "n={n} offset={offset} idx={idx}");
            }
        }
        assert_eq!(clipped_index(3, 10), 0);
        assert_eq!(clipped_index(3, -4), 2);
        assert_eq!(clipped_index(3, 0), 2);
        assert_eq!(clipped_index(0, 5), 0);
    }

    #[test]
    fn test_whole_volume_pages() {
        let pages = WholeVolume::new("vol", 4);
        assert_eq!(pages.requested_page_count(), 4);
        assert_eq!(pages.requested_page_at(0), 1);
        assert_eq!(pages.token_for(3), "vol[4]");
        assert_eq!(pages.first_out_of_range(0), None);
    }

    #[test]
    fn test_partial_pages() {
        let seqs = [4, 2, 9];
        let pages = PartialPages::new("vol", &seqs);
        assert_eq!(pages.requested_page_count(), 3);
        assert_eq!(pages.token_for(1), "vol[2]");
        assert_eq!(pages.first_out_of_range(5), Some(9));
        assert_eq!(pages.first_out_of_range(9), None);
    }

    #[test]
    fn test_empty_selection_token_is_volume_id() {
        let pages = WholeVolume::new("vol", 0);
        assert_eq!(pages.token_for(0), "vol");
    }

    #[test]
    fn test_resolve_selection() {
        let info = VolumeInfo::new("vol", 5);
        let partial = ItemCoordinates::pages("vol", vec![3, 1]);
        let whole = ItemCoordinates::volume("vol");

        let sel = PageSelection::resolve(&partial, &info, Granularity::PartialPage);
        assert_eq!(sel.sequences(), vec![3, 1]);

        let sel = PageSelection::resolve(&partial, &info, Granularity::WholeVolume);
        assert_eq!(sel.sequences(), vec![1, 2, 3, 4, 5]);

        let sel = PageSelection::resolve(&whole, &info, Granularity::PartialPage);
        assert_eq!(sel.requested_page_count(), 5);
    }
}
