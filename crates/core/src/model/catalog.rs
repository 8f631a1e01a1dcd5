use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{GroupId, StudyActivityId, WordId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("word {field} cannot be empty")]
    EmptyWordField { field: &'static str },

    #[error("group name cannot be empty")]
    EmptyGroupName,

    #[error("study activity name cannot be empty")]
    EmptyActivityName,
}

fn required(value: String, err: CatalogError) -> Result<String, CatalogError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    if trimmed.len() == value.len() {
        Ok(value)
    } else {
        Ok(trimmed.to_owned())
    }
}

//
// ─── WORD ──────────────────────────────────────────────────────────────────────
//

/// A vocabulary item with its three parallel display forms.
///
/// Words are reference data: the review engine only reads their identity and
/// keys derived counters by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    id: WordId,
    japanese: String,
    romaji: String,
    english: String,
}

impl Word {
    /// Build a word, trimming surrounding whitespace from each form.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyWordField` if any form is blank.
    pub fn new(
        id: WordId,
        japanese: impl Into<String>,
        romaji: impl Into<String>,
        english: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            id,
            japanese: required(
                japanese.into(),
                CatalogError::EmptyWordField { field: "japanese" },
            )?,
            romaji: required(romaji.into(), CatalogError::EmptyWordField { field: "romaji" })?,
            english: required(
                english.into(),
                CatalogError::EmptyWordField { field: "english" },
            )?,
        })
    }

    #[must_use]
    pub fn id(&self) -> WordId {
        self.id
    }

    /// Native-script form.
    #[must_use]
    pub fn japanese(&self) -> &str {
        &self.japanese
    }

    /// Phonetic transliteration.
    #[must_use]
    pub fn romaji(&self) -> &str {
        &self.romaji
    }

    #[must_use]
    pub fn english(&self) -> &str {
        &self.english
    }
}

//
// ─── GROUP ─────────────────────────────────────────────────────────────────────
//

/// A named thematic collection of words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    name: String,
}

impl Group {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyGroupName` if the name is blank.
    pub fn new(id: GroupId, name: impl Into<String>) -> Result<Self, CatalogError> {
        Ok(Self {
            id,
            name: required(name.into(), CatalogError::EmptyGroupName)?,
        })
    }

    #[must_use]
    pub fn id(&self) -> GroupId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

//
// ─── STUDY ACTIVITY ────────────────────────────────────────────────────────────
//

/// A kind of exercise a study session can be launched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyActivity {
    id: StudyActivityId,
    name: String,
    thumbnail_url: String,
    description: String,
}

impl StudyActivity {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyActivityName` if the name is blank.
    pub fn new(
        id: StudyActivityId,
        name: impl Into<String>,
        thumbnail_url: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            id,
            name: required(name.into(), CatalogError::EmptyActivityName)?,
            thumbnail_url: thumbnail_url.into(),
            description: description.into(),
        })
    }

    #[must_use]
    pub fn id(&self) -> StudyActivityId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn thumbnail_url(&self) -> &str {
        &self.thumbnail_url
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
