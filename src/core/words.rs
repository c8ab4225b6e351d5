//! Word pools and round setup.
//!
//! A round draws `word_count` distinct items from one category pool and
//! plays them in a uniformly random order.

use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::VocabularyConfig;
use crate::error::{FailOpen, GameError, Result};
use crate::util::read_to_string_limited;

/// Word counts offered by the setup screen.
pub const WORD_COUNT_OPTIONS: [usize; 10] = [5, 10, 15, 20, 25, 30, 35, 40, 45, 50];

/// A word to pronounce and the image shown with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordItem {
    pub word: String,
    /// Opaque image handle, resolved by the presentation layer.
    #[serde(rename = "image", default)]
    pub image_ref: String,
}

impl WordItem {
    pub fn new(word: impl Into<String>, image_ref: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            image_ref: image_ref.into(),
        }
    }
}

/// A named word pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub words: Vec<WordItem>,
}

/// Input to a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    pub category: String,
    pub word_count: usize,
}

impl RoundConfig {
    /// Validate and build a round configuration.
    pub fn new(category: impl Into<String>, word_count: usize) -> Result<Self> {
        if word_count == 0 {
            return Err(GameError::invalid_state("word count must be at least 1"));
        }
        Ok(Self {
            category: category.into(),
            word_count,
        })
    }
}

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    #[serde(default, rename = "category")]
    categories: Vec<Category>,
}

/// All known word pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    categories: Vec<Category>,
}

fn builtin_category(id: &str, name: &str, words: &[&str]) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        image: Some(format!("images/category_{}.png", id)),
        words: words
            .iter()
            .map(|w| WordItem::new(*w, format!("images/word_{}.png", w.to_lowercase())))
            .collect(),
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Vocabulary {
    /// The pools shipped with the game.
    pub fn builtin() -> Self {
        Self {
            categories: vec![
                builtin_category("food", "Food", &["Apple", "Banana"]),
                builtin_category("animals", "Animals", &["Cat", "Dog"]),
                builtin_category("sports", "Sports", &["Soccer", "Baseball"]),
            ],
        }
    }

    /// Build from explicit categories, normalising them.
    pub fn from_categories(categories: Vec<Category>) -> Result<Self> {
        let mut normalised: Vec<Category> = Vec::with_capacity(categories.len());

        for mut category in categories {
            category.id = category.id.trim().to_string();
            if category.id.is_empty() {
                return Err(GameError::vocabulary("category id must not be empty"));
            }
            if normalised.iter().any(|c| c.id == category.id) {
                return Err(GameError::vocabulary(format!(
                    "category '{}' is defined twice",
                    category.id
                )));
            }
            if category.name.trim().is_empty() {
                category.name = category.id.clone();
            }

            let mut seen: Vec<String> = Vec::new();
            category.words.retain(|item| {
                let key = item.word.trim().to_lowercase();
                if key.is_empty() {
                    warn!(category = %category.id, "skipping empty word");
                    return false;
                }
                if seen.contains(&key) {
                    warn!(category = %category.id, word = %item.word, "skipping duplicate word");
                    return false;
                }
                seen.push(key);
                true
            });

            normalised.push(category);
        }

        Ok(Self {
            categories: normalised,
        })
    }

    /// Parse a TOML vocabulary file body.
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: VocabularyFile =
            toml::from_str(content).map_err(|e| GameError::vocabulary(e.to_string()))?;
        Self::from_categories(file.categories)
    }

    /// Load a TOML vocabulary file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string_limited(path)?;
        Self::from_toml(&content)
    }

    /// Built-in pools overlaid with the configured file, if any.
    ///
    /// A file that cannot be read leaves the built-in pools in place.
    pub fn from_config(config: &VocabularyConfig) -> Self {
        let builtin = Self::builtin();
        match &config.path {
            Some(path) => {
                let custom = Self::load(path).map(Some).fail_open_with("loading vocabulary", None);
                match custom {
                    Some(custom) => builtin.merge(custom),
                    None => builtin,
                }
            }
            None => builtin,
        }
    }

    /// Overlay `other`: its categories replace same-id ones and new ids are
    /// appended.
    pub fn merge(mut self, other: Vocabulary) -> Self {
        for category in other.categories {
            match self.categories.iter_mut().find(|c| c.id == category.id) {
                Some(existing) => *existing = category,
                None => self.categories.push(category),
            }
        }
        self
    }

    /// All categories in display order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Look up a category.
    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    /// Words of a category; unknown categories have an empty pool.
    pub fn pool(&self, id: &str) -> &[WordItem] {
        self.category(id).map(|c| c.words.as_slice()).unwrap_or(&[])
    }

    /// Draw the words for a round.
    pub fn draw<R: Rng + ?Sized>(&self, config: &RoundConfig, rng: &mut R) -> Vec<WordItem> {
        draw_words(self.pool(&config.category), config.word_count, rng)
    }
}

/// Draw `count` items without replacement and shuffle them (Fisher-Yates).
///
/// Takes the whole pool when it holds fewer than `count` items.
pub fn draw_words<R: Rng + ?Sized>(pool: &[WordItem], count: usize, rng: &mut R) -> Vec<WordItem> {
    let mut drawn: Vec<WordItem> = pool.choose_multiple(rng, count).cloned().collect();
    drawn.shuffle(rng);
    drawn
}
