//! In-memory title catalog
//!
//! The catalog is built once at startup from the dataset files, ranked by
//! relevance score, and shared read-only between resolver runs.

use std::collections::HashMap;

use crate::{
    error::{AppError, AppResult},
    models::{Title, TitleId},
};

pub mod loader;
pub mod scoring;

pub use loader::load_catalog;

/// Read-only index over the ranked catalog
#[derive(Debug, Default)]
pub struct CatalogIndex {
    titles: HashMap<TitleId, Title>,
    ranked: Vec<TitleId>,
}

impl CatalogIndex {
    /// Builds an index from titles already in rank order.
    ///
    /// Fails if an identifier appears twice.
    pub fn from_ranked(titles: Vec<Title>) -> AppResult<Self> {
        let mut index = HashMap::with_capacity(titles.len());
        let mut ranked = Vec::with_capacity(titles.len());

        for title in titles {
            let id = title.id.clone();
            if index.insert(id.clone(), title).is_some() {
                return Err(AppError::Catalog(format!(
                    "Duplicate title id {} in catalog",
                    id
                )));
            }
            ranked.push(id);
        }

        Ok(Self {
            titles: index,
            ranked,
        })
    }

    pub fn get(&self, id: &TitleId) -> Option<&Title> {
        self.titles.get(id)
    }

    pub fn contains(&self, id: &TitleId) -> bool {
        self.titles.contains_key(id)
    }

    /// Titles in rank order, best first
    pub fn ranked(&self) -> impl Iterator<Item = &Title> + '_ {
        self.ranked.iter().filter_map(|id| self.titles.get(id))
    }

    pub fn len(&self) -> usize {
        self.ranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty()
    }
}
