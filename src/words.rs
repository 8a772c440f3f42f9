//! Category and secret word content.
//!
//! The state machine only sees the [`WordSource`] trait; [`WordBank`] is the
//! JSON-backed implementation shipped with the server.

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Built-in categories compiled into the binary
const BUILTIN_CATEGORIES: &str = include_str!("../data/categories.json");

/// Errors that can occur while loading word content
#[derive(Debug, thiserror::Error)]
pub enum WordBankError {
    #[error("Failed to read word bank: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid word bank JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Word bank contains no usable categories")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// 25% easy, 50% medium, 25% hard
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        match rng.random_range(0..100u32) {
            0..25 => Difficulty::Easy,
            25..75 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WordPools {
    #[serde(default)]
    pub easy: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub hard: Vec<String>,
}

impl WordPools {
    pub fn pool(&self, difficulty: Difficulty) -> &[String] {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Medium => &self.medium,
            Difficulty::Hard => &self.hard,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.easy.iter().chain(&self.medium).chain(&self.hard)
    }

    fn is_empty(&self) -> bool {
        self.easy.is_empty() && self.medium.is_empty() && self.hard.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    pub words: WordPools,
}

/// Anything that can hand out categories for a round
pub trait WordSource: Send + Sync {
    fn categories(&self) -> &[Category];
}

/// JSON-backed category list
#[derive(Debug, Clone)]
pub struct WordBank {
    categories: Vec<Category>,
}

impl WordBank {
    /// Categories without a single word are dropped
    pub fn new(categories: Vec<Category>) -> Result<Self, WordBankError> {
        let categories: Vec<Category> = categories
            .into_iter()
            .map(|mut c| {
                for pool in [&mut c.words.easy, &mut c.words.medium, &mut c.words.hard] {
                    pool.retain(|w| !w.trim().is_empty());
                }
                c
            })
            .filter(|c| !c.words.is_empty())
            .collect();

        if categories.is_empty() {
            return Err(WordBankError::Empty);
        }
        Ok(Self { categories })
    }

    pub fn from_json(json: &str) -> Result<Self, WordBankError> {
        Self::new(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, WordBankError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn builtin() -> Result<Self, WordBankError> {
        Self::from_json(BUILTIN_CATEGORIES)
    }
}

impl WordSource for WordBank {
    fn categories(&self) -> &[Category] {
        &self.categories
    }
}

/// Category and secret word chosen for a round
#[derive(Debug, Clone, PartialEq)]
pub struct SecretDraw {
    pub category: String,
    pub word: String,
}

/// Pick a category uniformly, then a word from a difficulty-weighted pool.
///
/// `easy_only` pins the draw to the easy pool. A category whose rolled pool
/// is empty falls back to all of its words.
pub fn draw_secret<R: Rng + ?Sized>(
    source: &dyn WordSource,
    rng: &mut R,
    easy_only: bool,
) -> Option<SecretDraw> {
    let category = source.categories().choose(rng)?;
    let difficulty = if easy_only {
        Difficulty::Easy
    } else {
        Difficulty::roll(rng)
    };

    let word = match category.words.pool(difficulty).choose(rng) {
        Some(word) => word.clone(),
        None => {
            let all: Vec<&String> = category.words.all().collect();
            (*all.choose(rng)?).clone()
        }
    };

    Some(SecretDraw {
        category: category.name.clone(),
        word,
    })
}

/// Pick a word different from `secret`, preferring the same category
pub fn draw_decoy<R: Rng + ?Sized>(
    source: &dyn WordSource,
    rng: &mut R,
    category: &str,
    secret: &str,
) -> Option<String> {
    let target = normalize_word(secret);
    let differs = |w: &&String| normalize_word(w) != target;

    let same: Vec<&String> = source
        .categories()
        .iter()
        .filter(|c| c.name == category)
        .flat_map(|c| c.words.all())
        .filter(differs)
        .collect();
    if let Some(word) = same.choose(rng) {
        return Some((*word).clone());
    }

    let other: Vec<&String> = source
        .categories()
        .iter()
        .filter(|c| c.name != category)
        .flat_map(|c| c.words.all())
        .filter(differs)
        .collect();
    other.choose(rng).map(|w| (*w).clone())
}

/// Case-folded with every whitespace character removed
pub fn normalize_word(word: &str) -> String {
    word.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
