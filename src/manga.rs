use std::sync::Arc;

use uuid::Uuid;

pub mod chapter;
pub mod filter;
pub mod query;

use chapter::ChapterRecord;
use filter::{ChapterList, FilterCriteria};

/// The chapter feed of one manga.
#[derive(Debug, Clone)]
pub struct Manga {
    id: Uuid,
    chapters: Vec<Arc<ChapterRecord>>,
    total: u32,
}

impl Manga {
    pub fn new(id: Uuid, chapters: Vec<Arc<ChapterRecord>>, total: u32) -> Self {
        Self {
            id,
            chapters,
            total,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Every record the feed returned, in feed order.
    pub fn chapters(&self) -> &[Arc<ChapterRecord>] {
        &self.chapters
    }

    /// Number of records the server has for this feed, which can be more than
    /// were fetched when only one page was requested.
    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn filter(&self, criteria: &FilterCriteria) -> ChapterList {
        criteria.resolve(&self.chapters)
    }

    /// All records as a list, duplicates and order kept as the feed gave them.
    pub fn unfiltered(&self) -> ChapterList {
        ChapterList::from_records(self.chapters.iter().cloned())
    }
}
