//! # Request Validation
//!
//! Quota admission for a request's volumes and pages.
//!
//! # Check Order (per id, in request order)
//!
//! 1. Volume exists in the store
//! 2. Volume count within `MaxVolumesPolicy`
//! 3. Every requested page exists
//! 4. Requested pages within `MaxPagesPerVolumePolicy`
//! 5. Running page total within `MaxTotalPagesPolicy`
//!
//! When a quota is exceeded the reported token names one page of the
//! offending volume, chosen by [`clipped_index`], so violations are
//! reproducible.

mod pages;
mod tracker;
mod validator;

pub use pages::{
    clipped_index, page_token, Granularity, PageSelection, PartialPages, RequestedPages,
    WholeVolume,
};
pub use tracker::{QuotaTracker, ValidationState};
pub use validator::RequestValidator;
