use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use futures::{stream, StreamExt, TryStreamExt};
use tracing::debug;

use super::{ChapterDownloader, Destination};
use crate::{
    api::Client,
    error::{Error, Result},
    manga::chapter::{ChapterRecord, Quality},
};

/// Pages fetched at once within one chapter.
pub const PAGE_CONCURRENCY: usize = 5;

/// Downloads chapters from the mangadex at-home image servers.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
    concurrency: usize,
}

struct Page {
    name: String,
    bytes: Vec<u8>,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            concurrency: PAGE_CONCURRENCY,
        }
    }

    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .client
            .http()
            .get(url)
            .send()
            .await
            .map_err(|source| Error::request(url, source))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status,
            });
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|source| Error::request(url, source))?;
        Ok(bytes.to_vec())
    }

    /// Fetches every page, returned in page order whatever order they arrive in.
    async fn fetch_pages(&self, urls: Vec<String>) -> Result<Vec<Page>> {
        let len = urls.len();
        let mut pages: Vec<(usize, Page)> = stream::iter(urls.into_iter().enumerate())
            .map(|(index, url)| async move {
                let bytes = self.fetch(&url).await?;
                let name = page_name(index + 1, len, &url);
                Ok::<_, Error>((index, Page { name, bytes }))
            })
            .buffer_unordered(self.concurrency)
            .try_collect()
            .await?;

        pages.sort_by_key(|(index, _)| *index);
        Ok(pages.into_iter().map(|(_, page)| page).collect())
    }
}

/// `page_<n>.<ext>` with `n` zero padded to the width of the page count.
fn page_name(index: usize, len: usize, url: &str) -> String {
    let width = len.to_string().len();
    let ext = url
        .rsplit('/')
        .next()
        .map(|file| file.split(|c: char| c == '?' || c == '#').next().unwrap_or(file))
        .and_then(|file| file.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty())
        .unwrap_or("jpg");
    format!("page_{:0width$}.{}", index, ext, width = width)
}

async fn write_folder(path: &Path, pages: &[Page]) -> Result<()> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| Error::io(path, source))?;
    for page in pages {
        let file = path.join(&page.name);
        tokio::fs::write(&file, &page.bytes)
            .await
            .map_err(|source| Error::io(file, source))?;
    }
    Ok(())
}

/// Zip writing is synchronous, so it runs on the blocking pool.
async fn write_archive(chapter: &ChapterRecord, path: PathBuf, pages: Vec<Page>) -> Result<()> {
    tokio::task::spawn_blocking(move || write_archive_blocking(&path, &pages))
        .await
        .map_err(|_| Error::Panicked {
            chapter: chapter.chapter().to_string(),
        })?
}

fn write_archive_blocking(path: &Path, pages: &[Page]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| Error::io(parent, source))?;
    }
    let archive_err = |source| Error::Archive {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(|source| Error::io(path, source))?;
    let mut writer = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for page in pages {
        writer
            .start_file(page.name.as_str(), options)
            .map_err(archive_err)?;
        writer
            .write_all(&page.bytes)
            .map_err(|source| Error::io(path, source))?;
    }
    writer.finish().map_err(archive_err)?;
    Ok(())
}

#[async_trait]
impl ChapterDownloader for HttpDownloader {
    async fn download(
        &self,
        chapter: &ChapterRecord,
        quality: Quality,
        destination: &Destination,
    ) -> Result<()> {
        let urls = self.client.page_urls(chapter, quality).await?;
        debug!(
            chapter = chapter.chapter(),
            pages = urls.len(),
            "Fetching pages"
        );
        let pages = self.fetch_pages(urls).await?;

        match destination {
            Destination::Folder(path) => write_folder(path, &pages).await,
            Destination::Archive(path) => write_archive(chapter, path.clone(), pages).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn pages(names: &[&str]) -> Vec<Page> {
        names
            .iter()
            .map(|name| Page {
                name: name.to_string(),
                bytes: format!("bytes of {}", name).into_bytes(),
            })
            .collect()
    }

    #[tokio::test]
    async fn archive_is_written_off_the_runtime() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("sub").join("Ch. 4.cbz");
        let chapter = ChapterRecord::new(Uuid::nil(), "1", "4");

        write_archive(&chapter, path.clone(), pages(&["page_1.png", "page_2.png"]))
            .await
            .expect("archive should be written");

        let mut zip = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
        assert_eq!(zip.len(), 2);
        let mut content = String::new();
        zip.by_name("page_2.png")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "bytes of page_2.png");
    }

    #[tokio::test]
    async fn archive_under_a_file_fails_with_io() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let chapter = ChapterRecord::new(Uuid::nil(), "1", "4");

        let err = write_archive(&chapter, blocker.join("Ch. 4.zip"), pages(&["page_1.png"]))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn page_names_are_padded_and_keep_the_extension() {
        assert_eq!(page_name(1, 9, "https://x.org/data/h/1-abc.png"), "page_1.png");
        assert_eq!(page_name(3, 12, "https://x.org/data/h/3-abc.jpg"), "page_03.jpg");
        assert_eq!(page_name(7, 120, "https://x.org/a/b.webp?token=1"), "page_007.webp");
        assert_eq!(page_name(2, 5, "https://x.org/a/noext"), "page_2.jpg");
    }
}
