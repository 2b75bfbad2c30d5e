use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

use crate::error::CoreError;
use crate::types::{
    DailyStat, GameRecord, GameType, LearnerAccount, MistakeCategory, ReviewCard, VocabularyItem,
    WordProgress, WrongBookEntry,
};

pub mod memory;

pub use memory::MemoryStore;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("conflicting concurrent write for learner {learner_id}")]
    Conflict { learner_id: String },
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => CoreError::conflict(err.to_string()),
            StoreError::Unavailable(_) => CoreError::fatal(err.to_string()),
        }
    }
}

/// Every write of one logical event, applied by the store as a unit. A
/// reader never observes some of these fields committed without the others.
#[derive(Debug, Clone, Default)]
pub struct EventCommit {
    pub learner_id: String,
    /// Learner-state version the writes were computed against. A store that
    /// sees a different current version must reject with
    /// [`StoreError::Conflict`] and apply nothing.
    pub expected_version: Option<u64>,
    pub account: Option<LearnerAccount>,
    pub progress: Option<WordProgress>,
    pub card: Option<ReviewCard>,
    pub wrong_entries: Vec<WrongBookEntry>,
    pub daily: Option<DailyStat>,
    pub game_record: Option<GameRecord>,
}

/// Per-status progress counts plus lifetime answer totals for a learner.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgressSummary {
    pub total_words: i64,
    pub learning_words: i64,
    pub mastered_words: i64,
    pub correct_total: i64,
    pub wrong_total: i64,
}

/// Keyed storage collaborator for the progression core. Implementations own
/// layout and durability; this crate only relies on keyed reads, the listed
/// queries, and an atomic `commit`.
pub trait ProgressionStore: Send + Sync {
    // ----- keyed reads -----
    fn learner(&self, learner_id: &str) -> Result<Option<LearnerAccount>, StoreError>;
    fn learner_version(&self, learner_id: &str) -> Result<u64, StoreError>;
    fn item(&self, item_id: &str) -> Result<Option<VocabularyItem>, StoreError>;
    fn progress(&self, learner_id: &str, item_id: &str)
        -> Result<Option<WordProgress>, StoreError>;
    fn card(&self, learner_id: &str, item_id: &str) -> Result<Option<ReviewCard>, StoreError>;
    fn wrong_entry(
        &self,
        learner_id: &str,
        item_id: &str,
    ) -> Result<Option<WrongBookEntry>, StoreError>;
    fn daily_stat(&self, learner_id: &str, date: NaiveDate)
        -> Result<Option<DailyStat>, StoreError>;
    /// Calendar days with any recorded activity, for streak derivation.
    fn active_days(&self, learner_id: &str) -> Result<HashSet<NaiveDate>, StoreError>;

    // ----- event write -----
    fn commit(&self, commit: EventCommit) -> Result<(), StoreError>;

    // ----- queries -----
    fn due_cards(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReviewCard>, StoreError>;
    fn wrong_entries(
        &self,
        learner_id: &str,
        category: Option<MistakeCategory>,
    ) -> Result<Vec<WrongBookEntry>, StoreError>;
    fn remove_wrong_entry(&self, entry_id: &str) -> Result<bool, StoreError>;
    fn clear_wrong_entries(&self, learner_id: &str) -> Result<u64, StoreError>;
    fn daily_stats(&self, learner_id: &str, days: usize) -> Result<Vec<DailyStat>, StoreError>;
    fn game_records(&self, learner_id: &str, limit: usize)
        -> Result<Vec<GameRecord>, StoreError>;
    fn game_records_by_type(
        &self,
        game_type: GameType,
        limit: usize,
    ) -> Result<Vec<GameRecord>, StoreError>;
    fn progress_summary(&self, learner_id: &str) -> Result<ProgressSummary, StoreError>;

    // ----- host-facing seeding -----
    fn put_learner(&self, account: LearnerAccount) -> Result<(), StoreError>;
    fn put_item(&self, item: VocabularyItem) -> Result<(), StoreError>;
}
