//! Reference catalog loaded by a full reset.

use portal_core::model::{
    CatalogError, Group, GroupId, StudyActivity, StudyActivityId, Word, WordId,
};

/// Words, groups, activities and group memberships to load as a unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedCatalog {
    pub words: Vec<Word>,
    pub groups: Vec<Group>,
    pub activities: Vec<StudyActivity>,
    pub memberships: Vec<(GroupId, WordId)>,
}

impl SeedCatalog {
    /// The starter catalog: three animal words, two groups and two activities.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if a seeded entry fails validation.
    pub fn default_catalog() -> Result<Self, CatalogError> {
        let words = vec![
            Word::new(WordId::new(1), "犬", "inu", "dog")?,
            Word::new(WordId::new(2), "猫", "neko", "cat")?,
            Word::new(WordId::new(3), "鳥", "tori", "bird")?,
        ];
        let groups = vec![
            Group::new(GroupId::new(1), "Animals")?,
            Group::new(GroupId::new(2), "Basic Words")?,
        ];
        let activities = vec![
            StudyActivity::new(
                StudyActivityId::new(1),
                "Flashcards",
                "https://example.com/flashcards.png",
                "Practice with flashcards",
            )?,
            StudyActivity::new(
                StudyActivityId::new(2),
                "Multiple Choice",
                "https://example.com/quiz.png",
                "Test your knowledge with multiple choice questions",
            )?,
        ];
        let memberships = words.iter().map(|w| (GroupId::new(1), w.id())).collect();

        Ok(Self {
            words,
            groups,
            activities,
            memberships,
        })
    }
}
