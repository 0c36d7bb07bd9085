use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use uuid::Uuid;

use mgdex::{
    download::batch::{DELAY_THRESHOLD, PAGE_LIMIT},
    BatchConfig, BatchDownload, ChapterList, Client, FeedProgress, FilterCriteria,
    HttpDownloader, MangaQuery, NumRange, Order, OutputMode, Quality,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct GetManga {
    /// The UUID of the mangadex manga
    #[arg(short, long, required_unless_present = "chapter_id")]
    pub id: Option<Uuid>,

    /// Download these chapters as they are, skipping the feed and filters
    #[arg(long, conflicts_with = "id")]
    pub chapter_id: Vec<Uuid>,

    /// The language we get the manga translated into
    #[arg(long, default_value = "en")]
    pub language: String,

    /// Feed order, "asc" or "desc"
    #[arg(long, default_value = "asc")]
    pub order: Order,

    /// Comma separated volumes to download
    #[arg(long, value_delimiter = ',')]
    pub volumes: Vec<String>,

    /// Comma separated chapters to download
    #[arg(short, long, value_delimiter = ',')]
    pub chapters: Vec<String>,

    /// Inclusive range of volumes to download, e.g. 2..4
    #[arg(long)]
    pub volume_range: Option<NumRange>,

    /// Inclusive range of chapters to download, e.g. 10..20.5
    #[arg(long)]
    pub chapter_range: Option<NumRange>,

    /// Comma separated scanlation groups, preferred first, used when a chapter
    /// has more than one translation
    #[arg(long, value_delimiter = ',')]
    pub prefer_groups: Vec<String>,

    /// Download the compressed images
    #[arg(long)]
    pub data_saver: bool,

    /// Save every chapter as an archive instead of a folder
    #[arg(long)]
    pub archive: bool,

    /// Extension of the archives
    #[arg(long, default_value = "zip")]
    pub ext: String,

    /// Prepended to the chapter number to name its folder or archive. May
    /// contain directories. "#id#" becomes the chapter's position.
    #[arg(short, long, default_value = "Ch. ")]
    pub prefix: String,

    /// Most pages downloading at once
    #[arg(long, default_value_t = PAGE_LIMIT)]
    pub page_limit: usize,

    /// Pause after starting each chapter on large downloads
    #[arg(long, default_value_t = 1500)]
    pub launch_delay_ms: u64,

    /// Chapter count above which the launch pause applies
    #[arg(long, default_value_t = DELAY_THRESHOLD)]
    pub delay_threshold: usize,

    /// More output, repeat for trace level
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GetManga {
    fn criteria(&self) -> Result<FilterCriteria> {
        let mut criteria = FilterCriteria::new();
        if !self.volumes.is_empty() {
            criteria = criteria.volumes(&self.volumes);
        }
        if !self.chapters.is_empty() {
            criteria = criteria.chapters(&self.chapters);
        }
        if let Some(range) = self.volume_range {
            criteria = criteria.volume_range(range)?;
        }
        if let Some(range) = self.chapter_range {
            criteria = criteria.chapter_range(range)?;
        }
        if !self.prefer_groups.is_empty() {
            criteria = criteria.prefer_groups(&self.prefer_groups);
        }
        Ok(criteria)
    }

    async fn fetch_feed(&self, client: &Client, id: Uuid) -> Result<ChapterList> {
        let mut query = MangaQuery::new(id)
            .language(&self.language)
            .order(self.order)
            .limit(mgdex::manga::query::MAX_LIMIT);
        if !self.prefer_groups.is_empty() {
            query = query.include_scanlation_group();
        }

        let style = ProgressStyle::with_template(
            "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
        )?;
        let pb = ProgressBar::new(0)
            .with_message("Fetching chapters")
            .with_style(style);

        let manga = client
            .get_all_chapters(&query, |FeedProgress { fetched, total }| {
                pb.set_length(total as u64);
                pb.set_position(fetched as u64);
            })
            .await
            .with_context(|| format!("Fetching the chapter feed of manga {}", id))?;
        pb.finish_with_message(format!("Grabbed {} chapters.", manga.chapters().len()));

        let chapters = manga.filter(&self.criteria()?);
        info!(
            "Selected {} of {} chapters",
            chapters.len(),
            manga.chapters().len()
        );
        Ok(chapters)
    }

    async fn fetch_chapters(&self, client: &Client) -> Result<ChapterList> {
        let mut records = Vec::with_capacity(self.chapter_id.len());
        for id in &self.chapter_id {
            let record = client
                .get_chapter(*id)
                .await
                .with_context(|| format!("Fetching chapter {}", id))?;
            if record.translated_language() != self.language {
                warn!(
                    "Chapter {} is in {:?}, not {:?}",
                    id,
                    record.translated_language(),
                    self.language
                );
            }
            records.push(Arc::new(record));
        }
        Ok(ChapterList::from_records(records))
    }

    /// Resolves the chapters to download and downloads them. Returns whether
    /// every chapter made it.
    pub async fn get(&self) -> Result<bool> {
        let client = Client::new()?;

        let chapters = match self.id {
            Some(id) => self.fetch_feed(&client, id).await?,
            None => self.fetch_chapters(&client).await?,
        };

        let mode = if self.archive {
            OutputMode::archive(&self.ext)
        } else {
            OutputMode::Folder
        };
        let config = BatchConfig {
            page_limit: self.page_limit,
            launch_delay: Duration::from_millis(self.launch_delay_ms),
            delay_threshold: self.delay_threshold,
        };

        let report = BatchDownload::new(Arc::new(HttpDownloader::new(client)))
            .config(config)
            .quality(Quality::from(self.data_saver))
            .prefix(&self.prefix)
            .mode(mode)
            .run(&chapters)
            .await;

        info!(
            "Downloaded {} chapters, {} failed",
            report.succeeded.len(),
            report.failed.len()
        );
        Ok(report.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_filters() -> Result<()> {
        let args = GetManga::parse_from([
            "mgdex",
            "--id",
            "f9c33607-9180-4ba6-b85c-e4b5faee7192",
            "--chapters",
            "1,2.5",
            "--chapter-range",
            "1..3",
            "--prefer-groups",
            "A,B",
            "--archive",
            "--ext",
            "cbz",
        ]);

        assert_eq!(args.chapters, ["1", "2.5"]);
        assert_eq!(args.prefer_groups, ["A", "B"]);
        assert_eq!(args.chapter_range, Some(NumRange::new(1.0, 3.0)?));
        assert!(args.archive);
        assert_eq!(
            args.criteria()?,
            FilterCriteria::new()
                .chapters(["1", "2.5"])
                .chapter_range(1.0..=3.0)?
                .prefer_groups(["A", "B"])
        );
        Ok(())
    }

    #[test]
    fn requires_a_manga_or_chapters() {
        assert!(GetManga::try_parse_from(["mgdex"]).is_err());
        assert!(GetManga::try_parse_from([
            "mgdex",
            "--chapter-id",
            "a96676e5-8ae2-425e-b549-7f15dd34a6d8"
        ])
        .is_ok());
    }

    #[test]
    fn rejects_bad_ranges() {
        assert!(GetManga::try_parse_from([
            "mgdex",
            "--id",
            "f9c33607-9180-4ba6-b85c-e4b5faee7192",
            "--chapter-range",
            "5..1"
        ])
        .is_err());
    }
}
