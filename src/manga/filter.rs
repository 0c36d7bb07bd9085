use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use super::chapter::ChapterRecord;
use crate::{
    error::{Error, Result},
    num_range::NumRange,
};

/// Chapters ordered by chapter number, at most one per number once filtered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChapterList(Vec<Arc<ChapterRecord>>);

impl ChapterList {
    /// Wraps records as they are, without filtering, deduplicating or sorting.
    pub fn from_records(records: impl IntoIterator<Item = Arc<ChapterRecord>>) -> Self {
        Self(records.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<ChapterRecord>> {
        self.0.iter()
    }

    /// Chapter numbers in list order.
    pub fn numbers(&self) -> Vec<&str> {
        self.0.iter().map(|record| record.chapter()).collect()
    }
}

impl<'a> IntoIterator for &'a ChapterList {
    type Item = &'a Arc<ChapterRecord>;
    type IntoIter = std::slice::Iter<'a, Arc<ChapterRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Criteria a chapter must meet to be kept. Everything configured is ANDed,
/// anything left unset always passes.
///
/// Each setter returns a new value, leaving the one it was called on intact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    volumes: Option<HashSet<String>>,
    chapters: Option<HashSet<String>>,
    volume_range: Option<NumRange>,
    chapter_range: Option<NumRange>,
    prefer_groups: Option<HashMap<String, usize>>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only keep chapters whose volume is one of `volumes`.
    #[must_use]
    pub fn volumes<I, S>(&self, volumes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            volumes: Some(volumes.into_iter().map(Into::into).collect()),
            ..self.clone()
        }
    }

    /// Only keep chapters whose number is one of `chapters`.
    #[must_use]
    pub fn chapters<I, S>(&self, chapters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chapters: Some(chapters.into_iter().map(Into::into).collect()),
            ..self.clone()
        }
    }

    /// Only keep chapters whose volume parses into `range`. Fails on an
    /// inverted or NaN range.
    pub fn volume_range<R>(&self, range: R) -> Result<Self>
    where
        R: TryInto<NumRange>,
        R::Error: Into<Error>,
    {
        Ok(Self {
            volume_range: Some(range.try_into().map_err(Into::<Error>::into)?),
            ..self.clone()
        })
    }

    pub fn chapter_range<R>(&self, range: R) -> Result<Self>
    where
        R: TryInto<NumRange>,
        R::Error: Into<Error>,
    {
        Ok(Self {
            chapter_range: Some(range.try_into().map_err(Into::<Error>::into)?),
            ..self.clone()
        })
    }

    /// Rank scanlation groups, earliest first. When several versions of a
    /// chapter pass the filter, the one from the highest ranked group wins.
    /// This never removes a chapter on its own.
    #[must_use]
    pub fn prefer_groups<I, S>(&self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let groups: Vec<String> = groups
            .into_iter()
            .map(|group| group.as_ref().to_lowercase())
            .collect();
        let len = groups.len();
        let ranks = groups
            .into_iter()
            .enumerate()
            .map(|(index, group)| (group, len - index))
            .collect();

        Self {
            prefer_groups: Some(ranks),
            ..self.clone()
        }
    }

    fn accepts(&self, record: &ChapterRecord) -> bool {
        self.volumes
            .as_ref()
            .map_or(true, |volumes| volumes.contains(record.volume()))
            && self
                .chapters
                .as_ref()
                .map_or(true, |chapters| chapters.contains(record.chapter()))
            && self
                .volume_range
                .map_or(true, |range| range.contains_str(record.volume()))
            && self
                .chapter_range
                .map_or(true, |range| range.contains_str(record.chapter()))
    }

    fn rank(ranks: &HashMap<String, usize>, record: &ChapterRecord) -> usize {
        ranks
            .get(&record.scanlation_group().to_lowercase())
            .copied()
            .unwrap_or(0)
    }

    /// Selects one record per chapter number out of `records` and sorts the
    /// result by chapter number. Numbers that do not parse sort last.
    pub fn resolve(&self, records: &[Arc<ChapterRecord>]) -> ChapterList {
        let mut slots: Vec<Arc<ChapterRecord>> = Vec::new();
        let mut by_chapter: HashMap<&str, usize> = HashMap::new();

        for record in records {
            match by_chapter.get(record.chapter()) {
                Some(&slot) => {
                    // Already validated, only the group preference can swap it.
                    if let Some(ranks) = &self.prefer_groups {
                        if Self::rank(ranks, &slots[slot]) < Self::rank(ranks, record) {
                            slots[slot] = Arc::clone(record);
                        }
                    }
                }
                None => {
                    if self.accepts(record) {
                        by_chapter.insert(record.chapter(), slots.len());
                        slots.push(Arc::clone(record));
                    }
                }
            }
        }

        let sort_key = |record: &Arc<ChapterRecord>| record.number().unwrap_or(f64::INFINITY);
        slots.sort_by(|a, b| sort_key(a).total_cmp(&sort_key(b)));
        ChapterList(slots)
    }
}
