use std::str::FromStr;

use uuid::Uuid;

use crate::error::Error;

/// Max that the mangadex api allows per feed page.
pub const MAX_LIMIT: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Ascending,
    Descending,
}

impl Order {
    pub fn as_str(&self) -> &'static str {
        match self {
            Order::Ascending => "asc",
            Order::Descending => "desc",
        }
    }
}

impl FromStr for Order {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Order::Ascending),
            "desc" => Ok(Order::Descending),
            other => Err(Error::Validation(format!(
                "expect order to be \"asc\" or \"desc\", found {:?}",
                other
            ))),
        }
    }
}

/// Parameters of a manga feed request.
///
/// Every setter returns a new query, so a base query can be shared and
/// specialised without the copies affecting each other.
#[derive(Debug, Clone, PartialEq)]
pub struct MangaQuery {
    id: Uuid,
    language: String,
    limit: u32,
    offset: u32,
    order: Order,
    include_group: bool,
}

impl MangaQuery {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            language: "en".into(),
            limit: 100,
            offset: 0,
            order: Order::Ascending,
            include_group: false,
        }
    }

    #[must_use]
    pub fn language(&self, language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn limit(&self, limit: u32) -> Self {
        Self {
            limit,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn offset(&self, offset: u32) -> Self {
        Self {
            offset,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn order(&self, order: Order) -> Self {
        Self {
            order,
            ..self.clone()
        }
    }

    /// Ask the feed to embed each chapter's scanlation group, which group
    /// preferences need.
    #[must_use]
    pub fn include_scanlation_group(&self) -> Self {
        Self {
            include_group: true,
            ..self.clone()
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn get_offset(&self) -> u32 {
        self.offset
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.language.trim().is_empty() {
            return Err(Error::Validation("language is empty".into()));
        }
        if !(1..=MAX_LIMIT).contains(&self.limit) {
            return Err(Error::Validation(format!(
                "limit {} is not in range [1..{}]",
                self.limit, MAX_LIMIT
            )));
        }
        Ok(())
    }

    /// Query string pairs for the feed endpoint.
    pub(crate) fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("translatedLanguage[]", self.language.clone()),
            ("limit", self.limit.to_string()),
            ("offset", self.offset.to_string()),
            ("order[chapter]", self.order.as_str().to_string()),
        ];
        if self.include_group {
            params.push(("includes[]", "scanlation_group".to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let query = MangaQuery::new(Uuid::nil());
        assert!(query.validate().is_ok());
        assert_eq!(
            query.params(),
            vec![
                ("translatedLanguage[]", "en".to_string()),
                ("limit", "100".to_string()),
                ("offset", "0".to_string()),
                ("order[chapter]", "asc".to_string()),
            ]
        );
    }

    #[test]
    fn setters_do_not_touch_the_base() {
        let base = MangaQuery::new(Uuid::nil()).include_scanlation_group();
        let french = base.language("fr");
        let newest = base.order(Order::Descending).limit(10);

        assert_eq!(base, MangaQuery::new(Uuid::nil()).include_scanlation_group());
        assert!(french.params().contains(&("translatedLanguage[]", "fr".to_string())));
        assert!(french.params().contains(&("includes[]", "scanlation_group".to_string())));
        assert!(newest.params().contains(&("order[chapter]", "desc".to_string())));
        assert!(newest.params().contains(&("translatedLanguage[]", "en".to_string())));
    }

    #[test]
    fn rejects_empty_language() {
        let query = MangaQuery::new(Uuid::nil()).language("");
        assert!(matches!(query.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn rejects_limit_out_of_range() {
        assert!(MangaQuery::new(Uuid::nil()).limit(0).validate().is_err());
        assert!(MangaQuery::new(Uuid::nil()).limit(501).validate().is_err());
        assert!(MangaQuery::new(Uuid::nil()).limit(500).validate().is_ok());
    }

    #[test]
    fn parses_order() {
        assert_eq!("asc".parse::<Order>().ok(), Some(Order::Ascending));
        assert_eq!("desc".parse::<Order>().ok(), Some(Order::Descending));
        assert!("sideways".parse::<Order>().is_err());
    }
}
