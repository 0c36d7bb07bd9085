//! Thin client over the parts of the mangadex api we need: chapter feeds,
//! single chapters and the at-home servers that host page images.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{Error, Result},
    manga::{
        chapter::{ChapterObject, ChapterRecord, Quality},
        query::MangaQuery,
        Manga,
    },
};

mod constants {
    pub const ENDPOINT: &str = "https://api.mangadex.org";
    pub const USER_AGENT: &str = concat!("mgdex/", env!("CARGO_PKG_VERSION"));
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    data: Vec<ChapterObject>,
    limit: u32,
    offset: u32,
    total: u32,
}

#[derive(Debug, Deserialize)]
struct ChapterResponse {
    data: ChapterObject,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AtHomeResponse {
    base_url: String,
    chapter: AtHomeChapter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AtHomeChapter {
    hash: String,
    data: Vec<String>,
    data_saver: Vec<String>,
}

/// How far a paginated feed fetch has got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedProgress {
    pub fetched: usize,
    pub total: u32,
}

#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// A client for the public mangadex api.
    pub fn new() -> Result<Self> {
        Self::with_base_url(constants::ENDPOINT)
    }

    /// Points the client at another api host, mostly useful for tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(constants::USER_AGENT)
            .build()
            .map_err(Error::Client)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<T> {
        debug!(url, ?params, "Requesting {}", context);
        let resp = self
            .http
            .get(url)
            .query(params)
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

        let body = resp
            .text()
            .await
            .map_err(|source| Error::request(url, source))?;
        serde_json::from_str(&body).map_err(|source| Error::Decode {
            context: context.to_string(),
            source,
        })
    }

    async fn feed_page(&self, query: &MangaQuery) -> Result<FeedResponse> {
        query.validate()?;
        let url = format!("{}/manga/{}/feed", self.base_url, query.id());
        self.get_json(&url, &query.params(), &format!("feed of manga {}", query.id()))
            .await
    }

    /// Fetches one page of the manga's chapter feed, as described by `query`.
    pub async fn get_manga(&self, query: &MangaQuery) -> Result<Manga> {
        let page = self.feed_page(query).await?;
        let chapters = page
            .data
            .into_iter()
            .map(|chapter| Arc::new(ChapterRecord::from(chapter)))
            .collect();
        Ok(Manga::new(query.id(), chapters, page.total))
    }

    /// Fetches the whole feed starting at the query's offset, following the
    /// pagination until the server runs out of chapters.
    pub async fn get_all_chapters(
        &self,
        query: &MangaQuery,
        mut on_page: impl FnMut(FeedProgress),
    ) -> Result<Manga> {
        let mut offset = query.get_offset();
        let mut chapters = Vec::new();
        let mut total;
        loop {
            let page = self.feed_page(&query.offset(offset)).await?;
            total = page.total;
            let received = page.data.len();
            chapters.extend(
                page.data
                    .into_iter()
                    .map(|chapter| Arc::new(ChapterRecord::from(chapter))),
            );

            on_page(FeedProgress {
                fetched: chapters.len(),
                total,
            });

            if received == 0 || page.limit == 0 || page.offset + page.limit >= page.total {
                break;
            }

            // Update the offset and paginate
            offset = page.offset + page.limit;
        }

        debug!(count = chapters.len(), total, "Fetched chapter feed");
        Ok(Manga::new(query.id(), chapters, total))
    }

    /// Looks up a single chapter, including its scanlation group.
    pub async fn get_chapter(&self, id: Uuid) -> Result<ChapterRecord> {
        let url = format!("{}/chapter/{}", self.base_url, id);
        let params = [("includes[]", "scanlation_group".to_string())];
        let chapter: ChapterResponse = self
            .get_json(&url, &params, &format!("chapter {}", id))
            .await?;
        Ok(chapter.data.into())
    }

    /// Urls of every page of `chapter` in page order.
    pub async fn page_urls(&self, chapter: &ChapterRecord, quality: Quality) -> Result<Vec<String>> {
        let url = format!("{}/at-home/server/{}", self.base_url, chapter.id());
        let server: AtHomeResponse = self
            .get_json(&url, &[], &format!("image server for chapter {}", chapter.id()))
            .await?;

        let files = match quality {
            Quality::Data => server.chapter.data,
            Quality::DataSaver => server.chapter.data_saver,
        };
        let base_url = server.base_url.trim_end_matches('/');
        Ok(files
            .iter()
            .map(|file| {
                format!(
                    "{}/{}/{}/{}",
                    base_url,
                    quality.path_segment(),
                    server.chapter.hash,
                    file
                )
            })
            .collect())
    }
}
