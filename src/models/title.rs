use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use crate::error::AppError;

/// Catalog identifier, a two-letter prefix followed by digits (e.g. "tt0080684")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TitleId(String);

impl TitleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_valid(raw: &str) -> bool {
        let bytes = raw.as_bytes();
        bytes.len() > 2
            && bytes[..2].iter().all(u8::is_ascii_alphabetic)
            && bytes[2..].iter().all(u8::is_ascii_digit)
    }
}

impl FromStr for TitleId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if Self::is_valid(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(AppError::InvalidInput(format!("Malformed title id '{}'", s)))
        }
    }
}

impl TryFrom<String> for TitleId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TitleId> for String {
    fn from(id: TitleId) -> Self {
        id.0
    }
}

impl Display for TitleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type tag of a catalog entry, using the dataset's own spelling
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum TitleType {
    Movie,
    Short,
    TvMovie,
    TvSeries,
    TvMiniSeries,
    TvSpecial,
    TvShort,
    TvEpisode,
    Video,
    VideoGame,
    #[serde(other)]
    Other,
}

impl TitleType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "movie" => TitleType::Movie,
            "short" => TitleType::Short,
            "tvMovie" => TitleType::TvMovie,
            "tvSeries" => TitleType::TvSeries,
            "tvMiniSeries" => TitleType::TvMiniSeries,
            "tvSpecial" => TitleType::TvSpecial,
            "tvShort" => TitleType::TvShort,
            "tvEpisode" => TitleType::TvEpisode,
            "video" => TitleType::Video,
            "videoGame" => TitleType::VideoGame,
            _ => TitleType::Other,
        }
    }

    pub fn is_series(self) -> bool {
        matches!(self, TitleType::TvSeries | TitleType::TvMiniSeries)
    }

    pub fn content_group(self) -> ContentGroup {
        match self {
            TitleType::TvSeries | TitleType::TvMiniSeries => ContentGroup::Series,
            TitleType::VideoGame => ContentGroup::VideoGames,
            _ => ContentGroup::NonSeries,
        }
    }
}

/// Groups whose scores are normalised independently of each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentGroup {
    NonSeries,
    Series,
    VideoGames,
}

/// A catalog title with its ratings and precomputed relevance score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Title {
    pub id: TitleId,
    pub name: String,
    pub title_type: TitleType,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub runtime_minutes: Option<u32>,
    pub num_votes: u64,
    pub average_rating: f64,
    pub score: f64,
}

impl Title {
    /// Whether a series has a known end year no later than `current_year`
    pub fn is_finished_series(&self, current_year: i32) -> bool {
        self.title_type.is_series() && self.end_year.is_some_and(|end| end <= current_year)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_id_parse_valid() {
        let id: TitleId = "tt0080684".parse().unwrap();
        assert_eq!(id.as_str(), "tt0080684");
        assert_eq!(format!("{}", id), "tt0080684");
    }

    #[test]
    fn test_title_id_parse_trims_whitespace() {
        let id: TitleId = " tt0076759\n".parse().unwrap();
        assert_eq!(id.as_str(), "tt0076759");
    }

    #[test]
    fn test_title_id_parse_rejects_malformed() {
        assert!("0080684".parse::<TitleId>().is_err());
        assert!("tt".parse::<TitleId>().is_err());
        assert!("tt00x0684".parse::<TitleId>().is_err());
        assert!("t10080684".parse::<TitleId>().is_err());
    }

    #[test]
    fn test_title_id_serde_is_plain_string() {
        let id: TitleId = "tt1375666".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#""tt1375666""#);

        let back: TitleId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<TitleId>(r#""nope""#).is_err());
    }

    #[test]
    fn test_title_type_parse_and_serialization() {
        assert_eq!(TitleType::parse("tvMiniSeries"), TitleType::TvMiniSeries);
        assert_eq!(TitleType::parse("podcast"), TitleType::Other);
        assert_eq!(
            serde_json::to_string(&TitleType::VideoGame).unwrap(),
            r#""videoGame""#
        );
    }

    #[test]
    fn test_content_group() {
        assert_eq!(TitleType::Movie.content_group(), ContentGroup::NonSeries);
        assert_eq!(TitleType::TvSeries.content_group(), ContentGroup::Series);
        assert_eq!(TitleType::VideoGame.content_group(), ContentGroup::VideoGames);
    }

    #[test]
    fn test_is_finished_series() {
        let mut title = Title {
            id: "tt0903747".parse().unwrap(),
            name: "Breaking Bad".to_string(),
            title_type: TitleType::TvSeries,
            start_year: Some(2008),
            end_year: Some(2013),
            runtime_minutes: Some(49),
            num_votes: 2_000_000,
            average_rating: 9.5,
            score: 9.7,
        };
        assert!(title.is_finished_series(2024));
        assert!(!title.is_finished_series(2010));

        title.end_year = None;
        assert!(!title.is_finished_series(2024));
    }
}
