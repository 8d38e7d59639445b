//! Source records as they appear in the archive's JSON documents.
//!
//! Dumps in the wild mix JSON numbers and numeric strings for the same field,
//! so ids and statistics are read leniently.

use serde::{de::Error as _, Deserialize, Deserializer};
use time::{macros::format_description, Date};

/// A record's archive-local identifier, normalized so `7` and `"7"` match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(String);

impl<'de> Deserialize<'de> for SourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match NumberOrText::deserialize(deserializer)? {
            NumberOrText::Number(n) => Ok(Self(n.to_string())),
            NumberOrText::Text(s) => Ok(Self(s.trim().to_string())),
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(serde_json::Number),
    Text(String),
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(n.as_f64()),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("invalid number {s:?}"))),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let whole = |f: f64| (f.is_finite() && f.fract() == 0.0).then_some(f as i64);
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(whole))
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid integer {n}"))),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(whole))
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid integer {s:?}")))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthorRecord {
    pub id: SourceId,
    pub name: String,
    #[serde(default)]
    pub about: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub ratings_count: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookRecord {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub author_id: SourceId,
    #[serde(default)]
    pub publication_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub average_rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub ratings_count: Option<i64>,
}

impl BookRecord {
    /// `YYYY-MM-DD`; blank or absent dates are `None`.
    pub fn parsed_publication_date(&self) -> Result<Option<Date>, time::error::Parse> {
        match self.publication_date.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Date::parse(raw, format_description!("[year]-[month]-[day]")).map(Some),
        }
    }
}
