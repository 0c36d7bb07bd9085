use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::{
    error::Result,
    manga::chapter::{ChapterRecord, Quality},
};

pub mod batch;
pub mod http;

pub use batch::{BatchConfig, BatchDownload, BatchReport, OutputMode};
pub use http::HttpDownloader;

/// Where a chapter's pages end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// A directory holding one image per page. Parents are created.
    Folder(PathBuf),
    /// A single zip file holding every page.
    Archive(PathBuf),
}

impl Destination {
    pub fn path(&self) -> &Path {
        match self {
            Destination::Folder(path) | Destination::Archive(path) => path,
        }
    }
}

/// Fetches the pages of one chapter and stores them at a destination.
///
/// The batch scheduler calls this once per chapter from its own task, so
/// implementations must be shareable across threads.
#[async_trait]
pub trait ChapterDownloader: Send + Sync {
    async fn download(
        &self,
        chapter: &ChapterRecord,
        quality: Quality,
        destination: &Destination,
    ) -> Result<()>;
}
