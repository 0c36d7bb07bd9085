//! Resolve a mangadex chapter feed, pick one version of every chapter and
//! download them in page limited batches.

pub mod api;
pub mod download;
pub mod error;
pub mod manga;
pub mod num_range;

pub use api::{Client, FeedProgress};
pub use download::{
    BatchConfig, BatchDownload, BatchReport, ChapterDownloader, Destination, HttpDownloader,
    OutputMode,
};
pub use error::{Error, Result};
pub use manga::{
    chapter::{ChapterRecord, Quality},
    filter::{ChapterList, FilterCriteria},
    query::{MangaQuery, Order},
    Manga,
};
pub use num_range::NumRange;
