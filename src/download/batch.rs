use std::{panic::AssertUnwindSafe, path::PathBuf, sync::Arc, time::Duration};

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{ChapterDownloader, Destination};
use crate::{
    error::Error,
    manga::{
        chapter::{ChapterRecord, Quality},
        filter::ChapterList,
    },
};

/// Most pages allowed in flight across all running chapters. Too many image
/// downloads at once leads to timeouts and network errors.
pub const PAGE_LIMIT: usize = 200;
/// Pause after every chapter launch once a batch is large enough.
pub const LAUNCH_DELAY: Duration = Duration::from_millis(1500);
/// Batches with more chapters than this get the launch delay.
pub const DELAY_THRESHOLD: usize = 40;
pub const DEFAULT_EXTENSION: &str = "zip";
/// Replaced in a name prefix by the chapter's position in the list.
pub const ID_PLACEHOLDER: &str = "#id#";

const MAX_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchConfig {
    pub page_limit: usize,
    pub launch_delay: Duration,
    pub delay_threshold: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            page_limit: PAGE_LIMIT,
            launch_delay: LAUNCH_DELAY,
            delay_threshold: DELAY_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One folder per chapter named `<prefix><chapter>`.
    #[default]
    Folder,
    /// One archive per chapter named `<prefix><chapter>.<extension>`.
    Archive { extension: String },
}

impl OutputMode {
    /// Archive mode, falling back to `zip` for an empty extension.
    pub fn archive(extension: impl Into<String>) -> Self {
        let extension = extension.into();
        let extension = match extension.trim_start_matches('.') {
            "" => DEFAULT_EXTENSION.to_string(),
            ext => ext.to_string(),
        };
        OutputMode::Archive { extension }
    }

    /// Where the chapter at `index` in the list is written.
    pub fn destination(&self, prefix: &str, index: usize, chapter: &str) -> Destination {
        let prefix = prefix.replace(ID_PLACEHOLDER, &format!("{:04}", index));
        match self {
            OutputMode::Folder => Destination::Folder(PathBuf::from(format!("{}{}", prefix, chapter))),
            OutputMode::Archive { extension } => Destination::Archive(PathBuf::from(format!(
                "{}{}.{}",
                prefix, chapter, extension
            ))),
        }
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Chapter numbers that downloaded, in completion order.
    pub succeeded: Vec<String>,
    /// Chapter numbers that failed with their error, in completion order.
    pub failed: Vec<(String, Error)>,
}

impl BatchReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

struct Completion {
    chapter: String,
    result: Result<(), Error>,
}

/// Bookkeeping for one run: what is in flight and where results arrive.
///
/// Only the scheduling loop touches this. Tasks report through the channel.
struct Admission {
    pages_in_flight: usize,
    outstanding: usize,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
    report: BatchReport,
}

impl Admission {
    fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.clamp(1, MAX_CHANNEL_CAPACITY));
        Self {
            pages_in_flight: 0,
            outstanding: 0,
            tx,
            rx,
            report: BatchReport::default(),
        }
    }

    /// Waits for every outstanding chapter to report, then starts a new batch.
    async fn drain(&mut self) {
        while self.outstanding > 0 {
            // The scheduler keeps a sender, so this only ends with a message.
            let Some(completion) = self.rx.recv().await else {
                break;
            };
            self.outstanding -= 1;
            match completion.result {
                Ok(()) => {
                    info!("Chapter {} downloaded.", completion.chapter);
                    self.report.succeeded.push(completion.chapter);
                }
                Err(err) => {
                    error!("Chapter {} failed: {}", completion.chapter, err);
                    self.report.failed.push((completion.chapter, err));
                }
            }
        }
        self.outstanding = 0;
        self.pages_in_flight = 0;
    }
}

/// Downloads every chapter of a list concurrently, a batch of pages at a time.
#[derive(Debug)]
pub struct BatchDownload<D> {
    downloader: Arc<D>,
    config: BatchConfig,
    quality: Quality,
    prefix: String,
    mode: OutputMode,
}

impl<D> BatchDownload<D>
where
    D: ChapterDownloader + 'static,
{
    pub fn new(downloader: Arc<D>) -> Self {
        Self {
            downloader,
            config: BatchConfig::default(),
            quality: Quality::Data,
            prefix: String::new(),
            mode: OutputMode::Folder,
        }
    }

    pub fn config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Prepended to every chapter number to build its output path. May
    /// contain directories, which are created.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Downloads every chapter and reports which ones failed.
    ///
    /// A new chapter is only started while the pages of the running ones plus
    /// its own stay within the page limit, otherwise every running chapter is
    /// awaited first. A failed chapter never stops the others.
    pub async fn run(&self, chapters: &ChapterList) -> BatchReport {
        if chapters.is_empty() {
            warn!("Chapter list is empty");
            return BatchReport::default();
        }

        let delay = chapters.len() > self.config.delay_threshold;
        let mut admission = Admission::new(chapters.len());

        for (index, chapter) in chapters.iter().enumerate() {
            let pages = chapter.page_count(self.quality);

            if admission.pages_in_flight + pages > self.config.page_limit
                && admission.outstanding > 0
            {
                debug!(
                    pages_in_flight = admission.pages_in_flight,
                    outstanding = admission.outstanding,
                    "Page limit reached, waiting for running chapters"
                );
                admission.drain().await;
            }

            admission.pages_in_flight += pages;
            let destination = self
                .mode
                .destination(&self.prefix, index, chapter.chapter());
            self.launch(Arc::clone(chapter), destination, admission.tx.clone());

            if delay {
                tokio::time::sleep(self.config.launch_delay).await;
            }
            admission.outstanding += 1;
        }

        admission.drain().await;
        admission.report
    }

    fn launch(
        &self,
        chapter: Arc<ChapterRecord>,
        destination: Destination,
        tx: mpsc::Sender<Completion>,
    ) {
        let downloader = Arc::clone(&self.downloader);
        let quality = self.quality;
        tokio::spawn(async move {
            debug!(
                chapter = chapter.chapter(),
                path = %destination.path().display(),
                "Starting chapter"
            );
            let result = AssertUnwindSafe(downloader.download(&chapter, quality, &destination))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| {
                    Err(Error::Panicked {
                        chapter: chapter.chapter().to_string(),
                    })
                });
            let completion = Completion {
                chapter: chapter.chapter().to_string(),
                result,
            };
            // Only fails if the scheduler is gone, nobody is left to tell.
            let _ = tx.send(completion).await;
        });
    }
}

impl ChapterList {
    /// Downloads every chapter into a folder named `<prefix><chapter>`.
    /// Returns true only if every chapter succeeded.
    pub async fn download<D>(&self, downloader: Arc<D>, quality: Quality, prefix: &str) -> bool
    where
        D: ChapterDownloader + 'static,
    {
        BatchDownload::new(downloader)
            .quality(quality)
            .prefix(prefix)
            .run(self)
            .await
            .is_ok()
    }

    /// Downloads every chapter into an archive named
    /// `<prefix><chapter>.<extension>`, `zip` if the extension is empty.
    /// Returns true only if every chapter succeeded.
    pub async fn download_as_archive<D>(
        &self,
        downloader: Arc<D>,
        quality: Quality,
        prefix: &str,
        extension: &str,
    ) -> bool
    where
        D: ChapterDownloader + 'static,
    {
        BatchDownload::new(downloader)
            .quality(quality)
            .prefix(prefix)
            .mode(OutputMode::archive(extension))
            .run(self)
            .await
            .is_ok()
    }
}
