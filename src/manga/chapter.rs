use serde::Deserialize;
use uuid::Uuid;

/// Which set of page images to fetch for a chapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    /// Original images.
    #[default]
    Data,
    /// Compressed images, mangadex calls these "data-saver".
    DataSaver,
}

impl Quality {
    /// Path segment used by the at-home image servers.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Quality::Data => "data",
            Quality::DataSaver => "data-saver",
        }
    }
}

impl From<bool> for Quality {
    fn from(data_saver: bool) -> Self {
        if data_saver {
            Quality::DataSaver
        } else {
            Quality::Data
        }
    }
}

/// One published version of a chapter as it appears in a feed.
///
/// Several records can share a chapter number when more than one scanlation
/// group translated it, so the number is the key used for grouping, never
/// the id.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterRecord {
    id: Uuid,
    volume: String,
    chapter: String,
    title: String,
    translated_language: String,
    scanlation_group: Option<String>,
    pages: u32,
    hash: String,
    data: Vec<String>,
    data_saver: Vec<String>,
}

impl ChapterRecord {
    pub fn new(id: Uuid, volume: impl Into<String>, chapter: impl Into<String>) -> Self {
        Self {
            id,
            volume: volume.into(),
            chapter: chapter.into(),
            title: String::new(),
            translated_language: String::new(),
            scanlation_group: None,
            pages: 0,
            hash: String::new(),
            data: Vec::new(),
            data_saver: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_scanlation_group(mut self, group: impl Into<String>) -> Self {
        self.scanlation_group = Some(group.into());
        self
    }

    /// Sets the page files for both qualities, as the legacy feed returned them.
    pub fn with_page_files(
        mut self,
        hash: impl Into<String>,
        data: Vec<String>,
        data_saver: Vec<String>,
    ) -> Self {
        self.hash = hash.into();
        self.pages = data.len().max(data_saver.len()) as u32;
        self.data = data;
        self.data_saver = data_saver;
        self
    }

    /// Sets the advertised page count without any file names.
    pub fn with_page_count(mut self, pages: u32) -> Self {
        self.pages = pages;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Volume number, empty when the chapter has no volume.
    pub fn volume(&self) -> &str {
        &self.volume
    }

    /// Chapter number, empty for oneshots.
    pub fn chapter(&self) -> &str {
        &self.chapter
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Language code of the translation, e.g. `en`.
    pub fn translated_language(&self) -> &str {
        &self.translated_language
    }

    /// Name of the group that translated this version, empty if the feed was
    /// requested without the scanlation group include.
    pub fn scanlation_group(&self) -> &str {
        self.scanlation_group.as_deref().unwrap_or_default()
    }

    /// The chapter number as a float, `None` if it does not parse.
    pub fn number(&self) -> Option<f64> {
        self.chapter
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| !n.is_nan())
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn page_files(&self, quality: Quality) -> &[String] {
        match quality {
            Quality::Data => &self.data,
            Quality::DataSaver => &self.data_saver,
        }
    }

    /// Number of pages that will be fetched for `quality`.
    ///
    /// Current feeds only advertise a count, the file names come from the
    /// at-home server, so fall back to that count when no names are known.
    pub fn page_count(&self, quality: Quality) -> usize {
        match self.page_files(quality).len() {
            0 => self.pages as usize,
            n => n,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChapterObject {
    id: Uuid,
    attributes: ChapterAttributes,
    #[serde(default)]
    relationships: Vec<Relationship>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChapterAttributes {
    volume: Option<String>,
    chapter: Option<String>,
    title: Option<String>,
    translated_language: Option<String>,
    #[serde(default)]
    pages: u32,
    #[serde(default)]
    hash: String,
    #[serde(default)]
    data: Vec<String>,
    #[serde(default)]
    data_saver: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    #[serde(rename = "type")]
    kind: String,
    // Attributes differ per relationship type and are only present when
    // the request asked for the expansion.
    attributes: Option<serde_json::Value>,
}

impl From<ChapterObject> for ChapterRecord {
    fn from(value: ChapterObject) -> Self {
        let scanlation_group = value
            .relationships
            .iter()
            .filter(|rel| rel.kind == "scanlation_group")
            .find_map(|rel| {
                rel.attributes
                    .as_ref()
                    .and_then(|attributes| attributes.get("name"))
                    .and_then(|name| name.as_str())
                    .map(str::to_owned)
            });

        let attributes = value.attributes;
        let pages = attributes
            .pages
            .max(attributes.data.len().max(attributes.data_saver.len()) as u32);

        ChapterRecord {
            id: value.id,
            volume: attributes.volume.unwrap_or_default(),
            chapter: attributes.chapter.unwrap_or_default(),
            title: attributes.title.unwrap_or_default(),
            translated_language: attributes.translated_language.unwrap_or_default(),
            scanlation_group,
            pages,
            hash: attributes.hash,
            data: attributes.data,
            data_saver: attributes.data_saver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: serde_json::Value) -> ChapterRecord {
        serde_json::from_value::<ChapterObject>(value)
            .expect("valid chapter object")
            .into()
    }

    #[test]
    fn normalizes_missing_fields_to_empty_strings() {
        let record = decode(json!({
            "id": "a96676e5-8ae2-425e-b549-7f15dd34a6d8",
            "type": "chapter",
            "attributes": {
                "volume": null,
                "chapter": null,
                "title": null,
                "translatedLanguage": "en",
                "pages": 12
            },
            "relationships": []
        }));

        assert_eq!(record.volume(), "");
        assert_eq!(record.chapter(), "");
        assert_eq!(record.title(), "");
        assert_eq!(record.translated_language(), "en");
        assert_eq!(record.scanlation_group(), "");
        assert_eq!(record.number(), None);
        assert_eq!(record.page_count(Quality::Data), 12);
        assert_eq!(record.page_count(Quality::DataSaver), 12);
    }

    #[test]
    fn resolves_scanlation_group_from_relationships() {
        let record = decode(json!({
            "id": "a96676e5-8ae2-425e-b549-7f15dd34a6d8",
            "attributes": { "volume": "2", "chapter": "10.5", "title": "Night" },
            "relationships": [
                { "id": "f9c33607-9180-4ba6-b85c-e4b5faee7192", "type": "manga" },
                {
                    "id": "b8a3d6de-1f01-4e63-9a0b-2f6c66e1e0f1",
                    "type": "user",
                    "attributes": { "username": "uploader" }
                },
                {
                    "id": "145f9110-0a6c-4b71-8737-6acb1a3c5da4",
                    "type": "scanlation_group",
                    "attributes": { "name": "Early Birds" }
                }
            ]
        }));

        assert_eq!(record.scanlation_group(), "Early Birds");
        assert_eq!(record.volume(), "2");
        assert_eq!(record.number(), Some(10.5));
    }

    #[test]
    fn legacy_page_lists_drive_the_page_count() {
        let record = decode(json!({
            "id": "a96676e5-8ae2-425e-b549-7f15dd34a6d8",
            "attributes": {
                "volume": "1",
                "chapter": "1",
                "hash": "abc",
                "data": ["1.png", "2.png", "3.png"],
                "dataSaver": ["1.jpg", "2.jpg"]
            }
        }));

        assert_eq!(record.hash(), "abc");
        assert_eq!(record.page_count(Quality::Data), 3);
        assert_eq!(record.page_count(Quality::DataSaver), 2);
        assert_eq!(record.page_files(Quality::DataSaver), ["1.jpg", "2.jpg"]);
    }

    #[test]
    fn built_records_count_their_files() {
        let record = ChapterRecord::new(Uuid::nil(), "3", "21")
            .with_title("Homecoming")
            .with_page_files("h", vec!["1.png".into(), "2.png".into()], Vec::new());

        assert_eq!(record.title(), "Homecoming");
        assert_eq!(record.page_count(Quality::Data), 2);
        // No saver files listed, so the advertised count is used.
        assert_eq!(record.page_count(Quality::DataSaver), 2);
        assert!(record.page_files(Quality::DataSaver).is_empty());
    }

    #[test]
    fn quality_from_data_saver_flag() {
        assert_eq!(Quality::from(true), Quality::DataSaver);
        assert_eq!(Quality::from(false), Quality::Data);
        assert_eq!(Quality::DataSaver.path_segment(), "data-saver");
    }
}
