//! Dataset loading
//!
//! Reads the tab-separated `title.basics` and `title.ratings` exports,
//! inner-joins them on the title id, and hands the result to the scorer.
//! `\N` marks a null field. Missing header columns are fatal; individual
//! malformed rows are skipped and counted.

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use crate::{
    catalog::{scoring, CatalogIndex},
    error::{AppError, AppResult},
    models::{Title, TitleId, TitleType},
};

const NULL: &str = "\\N";

const BASICS_COLUMNS: [&str; 7] = [
    "tconst",
    "titleType",
    "primaryTitle",
    "isAdult",
    "startYear",
    "endYear",
    "runtimeMinutes",
];

const RATINGS_COLUMNS: [&str; 3] = ["tconst", "averageRating", "numVotes"];

/// Loads, joins and ranks both dataset files
pub fn load_catalog(basics_path: &Path, ratings_path: &Path) -> AppResult<CatalogIndex> {
    let ratings = read_ratings(open(ratings_path)?)?;
    tracing::info!(count = ratings.len(), path = %ratings_path.display(), "Loaded ratings");

    let titles = read_basics(open(basics_path)?, &ratings)?;
    tracing::info!(count = titles.len(), path = %basics_path.display(), "Loaded rated titles");

    CatalogIndex::from_ranked(scoring::rank_catalog(titles))
}

fn open(path: &Path) -> AppResult<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| AppError::Catalog(format!("Cannot open {}: {}", path.display(), e)))
}

/// Column positions resolved from a header line
struct Header {
    positions: HashMap<String, usize>,
}

impl Header {
    fn parse(line: &str, required: &[&str]) -> AppResult<Self> {
        let positions: HashMap<String, usize> = line
            .trim_end_matches(['\r', '\n'])
            .split('\t')
            .enumerate()
            .map(|(i, name)| (name.to_string(), i))
            .collect();

        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|c| !positions.contains_key(*c))
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Catalog(format!(
                "Dataset is missing required columns: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { positions })
    }

    fn field<'a>(&self, fields: &[&'a str], name: &str) -> Option<&'a str> {
        self.positions
            .get(name)
            .and_then(|i| fields.get(*i))
            .copied()
            .filter(|v| *v != NULL)
    }
}

fn read_header<R: BufRead>(lines: &mut std::io::Lines<R>, required: &[&str]) -> AppResult<Header> {
    match lines.next() {
        Some(Ok(line)) => Header::parse(&line, required),
        Some(Err(e)) => Err(AppError::Catalog(format!("Cannot read dataset header: {}", e))),
        None => Err(AppError::Catalog("Dataset is empty".to_string())),
    }
}

/// Reads `title.ratings` into id → (average rating, vote count)
pub fn read_ratings<R: BufRead>(reader: R) -> AppResult<HashMap<TitleId, (f64, u64)>> {
    let mut lines = reader.lines();
    let header = read_header(&mut lines, &RATINGS_COLUMNS)?;

    let mut ratings = HashMap::new();
    let mut skipped = 0usize;

    for line in lines {
        let line = line.map_err(|e| AppError::Catalog(format!("Cannot read ratings: {}", e)))?;
        let fields: Vec<&str> = line.split('\t').collect();

        let parsed = (|| {
            let id: TitleId = header.field(&fields, "tconst")?.parse().ok()?;
            let rating: f64 = header.field(&fields, "averageRating")?.parse().ok()?;
            let votes: u64 = header.field(&fields, "numVotes")?.parse().ok()?;
            Some((id, (rating, votes)))
        })();

        match parsed {
            Some((id, value)) => {
                ratings.insert(id, value);
            }
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped malformed ratings rows");
    }

    Ok(ratings)
}

/// Reads `title.basics`, keeping only rated, non-adult, non-episode titles
pub fn read_basics<R: BufRead>(
    reader: R,
    ratings: &HashMap<TitleId, (f64, u64)>,
) -> AppResult<Vec<Title>> {
    let mut lines = reader.lines();
    let header = read_header(&mut lines, &BASICS_COLUMNS)?;

    let mut titles = Vec::new();
    let mut skipped = 0usize;

    for line in lines {
        let line = line.map_err(|e| AppError::Catalog(format!("Cannot read titles: {}", e)))?;
        let fields: Vec<&str> = line.split('\t').collect();

        let Some(id) = header
            .field(&fields, "tconst")
            .and_then(|raw| raw.parse::<TitleId>().ok())
        else {
            skipped += 1;
            continue;
        };

        let Some(&(average_rating, num_votes)) = ratings.get(&id) else {
            continue;
        };

        if header.field(&fields, "isAdult") == Some("1") {
            continue;
        }

        let title_type = TitleType::parse(header.field(&fields, "titleType").unwrap_or_default());
        if title_type == TitleType::TvEpisode {
            continue;
        }

        let Some(name) = header.field(&fields, "primaryTitle") else {
            skipped += 1;
            continue;
        };

        titles.push(Title {
            id,
            name: name.to_string(),
            title_type,
            start_year: header.field(&fields, "startYear").and_then(|v| v.parse().ok()),
            end_year: header.field(&fields, "endYear").and_then(|v| v.parse().ok()),
            runtime_minutes: header
                .field(&fields, "runtimeMinutes")
                .and_then(|v| v.parse().ok()),
            num_votes,
            average_rating,
            score: 0.0,
        });
    }

    if skipped > 0 {
        tracing::warn!(skipped, "Skipped malformed title rows");
    }

    Ok(titles)
}
