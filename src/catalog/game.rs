//! Game record carried in provider replies.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One catalog record.
///
/// Serialized in camelCase; optional fields are omitted when unset and
/// `releaseDate` uses `yyyy-mm-dd`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: u32,
    pub title: String,
    pub genre: String,
    pub price: f64,
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub developer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub esrb_rating: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<NaiveDate>,
    /// Label of the backend that produced the record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Game {
    pub fn new(id: u32, title: impl Into<String>, genre: impl Into<String>, price: f64, stock: u32) -> Self {
        Self {
            id,
            title: title.into(),
            genre: genre.into(),
            price,
            stock,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_studio(mut self, publisher: impl Into<String>, developer: impl Into<String>) -> Self {
        self.publisher = Some(publisher.into());
        self.developer = Some(developer.into());
        self
    }

    pub fn with_rating(mut self, esrb_rating: impl Into<String>) -> Self {
        self.esrb_rating = Some(esrb_rating.into());
        self
    }

    /// Sets the release date; an impossible date leaves it unset.
    pub fn released(mut self, year: i32, month: u32, day: u32) -> Self {
        self.release_date = NaiveDate::from_ymd_opt(year, month, day);
        self
    }

    pub fn on_platforms<I, S>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.platforms = platforms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `query` names this game: quotes are ignored and the match is a
    /// case-insensitive substring match on the title.
    pub fn title_matches(&self, query: &str) -> bool {
        let needle = normalize_title(query);
        !needle.is_empty() && self.title.to_lowercase().contains(&needle)
    }
}

/// Strips quotes and surrounding whitespace, lowercases.
pub fn normalize_title(query: &str) -> String {
    query.replace('"', "").trim().to_lowercase()
}

/// Sorts `games` by title, ignoring case.
pub fn sort_by_title(games: &mut [Game]) {
    games.sort_by_cached_key(|g| g.title.to_lowercase());
}
