//! Paginated dataset source for SGP.
//!
//! The dataset API serves records a page at a time; each page carries a
//! `next` cursor that is null on the last page. This crate defines the
//! fetcher contract ([`PageFetcher`]), the page loop ([`Paginator`]), and the
//! record shapes the loop yields ([`Image`], [`Region`], [`QaPair`]).
//!
//! Transport is left to the embedder: anything that can turn a URL into a
//! JSON value implements [`PageFetcher`]. [`StaticFetcher`] serves canned
//! pages from memory.

pub mod error;
pub mod page;
pub mod paginate;
pub mod records;

pub use error::{SourceError, SourceResult};
pub use page::{Page, PageFetcher, StaticFetcher};
pub use paginate::{Paginator, IDS_PER_PAGE};
pub use records::{Image, QaPair, QaType, Region};
