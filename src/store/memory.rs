use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

use crate::store::{EventCommit, ProgressSummary, ProgressionStore, StoreError};
use crate::types::{
    DailyStat, GameRecord, GameType, LearnerAccount, MistakeCategory, ReviewCard, VocabularyItem,
    WordProgress, WordStatus, WrongBookEntry,
};

type PairKey = (String, String);

#[derive(Default)]
struct StoreInner {
    learners: HashMap<String, LearnerAccount>,
    versions: HashMap<String, u64>,
    items: HashMap<String, VocabularyItem>,
    progress: HashMap<PairKey, WordProgress>,
    cards: HashMap<PairKey, ReviewCard>,
    wrong: HashMap<PairKey, WrongBookEntry>,
    daily: HashMap<(String, NaiveDate), DailyStat>,
    games: Vec<GameRecord>,
}

/// In-process reference implementation of [`ProgressionStore`].
///
/// All state lives behind one `RwLock`, so `commit` is observed
/// all-or-nothing by every reader. Lost updates are prevented one level up
/// (the engine serializes per learner) with the version check here as the
/// backstop for writers that bypass that serialization.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(learner_id: &str, item_id: &str) -> PairKey {
    (learner_id.to_string(), item_id.to_string())
}

impl ProgressionStore for MemoryStore {
    fn learner(&self, learner_id: &str) -> Result<Option<LearnerAccount>, StoreError> {
        Ok(self.inner.read().learners.get(learner_id).cloned())
    }

    fn learner_version(&self, learner_id: &str) -> Result<u64, StoreError> {
        Ok(self.inner.read().versions.get(learner_id).copied().unwrap_or(0))
    }

    fn item(&self, item_id: &str) -> Result<Option<VocabularyItem>, StoreError> {
        Ok(self.inner.read().items.get(item_id).cloned())
    }

    fn progress(
        &self,
        learner_id: &str,
        item_id: &str,
    ) -> Result<Option<WordProgress>, StoreError> {
        Ok(self.inner.read().progress.get(&key(learner_id, item_id)).cloned())
    }

    fn card(&self, learner_id: &str, item_id: &str) -> Result<Option<ReviewCard>, StoreError> {
        Ok(self.inner.read().cards.get(&key(learner_id, item_id)).cloned())
    }

    fn wrong_entry(
        &self,
        learner_id: &str,
        item_id: &str,
    ) -> Result<Option<WrongBookEntry>, StoreError> {
        Ok(self.inner.read().wrong.get(&key(learner_id, item_id)).cloned())
    }

    fn daily_stat(
        &self,
        learner_id: &str,
        date: NaiveDate,
    ) -> Result<Option<DailyStat>, StoreError> {
        Ok(self
            .inner
            .read()
            .daily
            .get(&(learner_id.to_string(), date))
            .cloned())
    }

    fn active_days(&self, learner_id: &str) -> Result<HashSet<NaiveDate>, StoreError> {
        Ok(self
            .inner
            .read()
            .daily
            .keys()
            .filter(|(id, _)| id == learner_id)
            .map(|(_, date)| *date)
            .collect())
    }

    fn commit(&self, commit: EventCommit) -> Result<(), StoreError> {
        let mut inner = self.inner.write();

        if let Some(expected) = commit.expected_version {
            let current = inner.versions.get(&commit.learner_id).copied().unwrap_or(0);
            if current != expected {
                tracing::warn!(
                    learner_id = %commit.learner_id,
                    expected,
                    current,
                    "rejecting stale event commit"
                );
                return Err(StoreError::Conflict {
                    learner_id: commit.learner_id,
                });
            }
        }

        if let Some(account) = commit.account {
            inner.learners.insert(account.id.clone(), account);
        }
        if let Some(progress) = commit.progress {
            inner
                .progress
                .insert(key(&progress.learner_id, &progress.item_id), progress);
        }
        if let Some(card) = commit.card {
            inner.cards.insert(key(&card.learner_id, &card.item_id), card);
        }
        for entry in commit.wrong_entries {
            inner.wrong.insert(key(&entry.learner_id, &entry.item_id), entry);
        }
        if let Some(daily) = commit.daily {
            inner
                .daily
                .insert((daily.learner_id.clone(), daily.date), daily);
        }
        if let Some(record) = commit.game_record {
            inner.games.push(record);
        }

        *inner.versions.entry(commit.learner_id).or_insert(0) += 1;
        Ok(())
    }

    fn due_cards(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ReviewCard>, StoreError> {
        let inner = self.inner.read();
        let mut due: Vec<ReviewCard> = inner
            .cards
            .values()
            .filter(|card| card.learner_id == learner_id && card.next_review <= now)
            .cloned()
            .collect();
        due.sort_by_key(|card| card.next_review);
        due.truncate(limit);
        Ok(due)
    }

    fn wrong_entries(
        &self,
        learner_id: &str,
        category: Option<MistakeCategory>,
    ) -> Result<Vec<WrongBookEntry>, StoreError> {
        let inner = self.inner.read();
        let mut entries: Vec<WrongBookEntry> = inner
            .wrong
            .values()
            .filter(|entry| {
                entry.learner_id == learner_id
                    && category.map_or(true, |wanted| entry.category == wanted)
            })
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.last_wrong_at.cmp(&a.last_wrong_at));
        Ok(entries)
    }

    fn remove_wrong_entry(&self, entry_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.write();
        let found = inner
            .wrong
            .iter()
            .find(|(_, entry)| entry.id == entry_id)
            .map(|(key, _)| key.clone());
        match found {
            Some(key) => {
                inner.wrong.remove(&key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear_wrong_entries(&self, learner_id: &str) -> Result<u64, StoreError> {
        let mut inner = self.inner.write();
        let before = inner.wrong.len();
        inner.wrong.retain(|(id, _), _| id != learner_id);
        Ok((before - inner.wrong.len()) as u64)
    }

    fn daily_stats(&self, learner_id: &str, days: usize) -> Result<Vec<DailyStat>, StoreError> {
        let inner = self.inner.read();
        let mut stats: Vec<DailyStat> = inner
            .daily
            .values()
            .filter(|stat| stat.learner_id == learner_id)
            .cloned()
            .collect();
        stats.sort_by(|a, b| b.date.cmp(&a.date));
        stats.truncate(days);
        Ok(stats)
    }

    fn game_records(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<GameRecord>, StoreError> {
        let inner = self.inner.read();
        let mut records: Vec<GameRecord> = inner
            .games
            .iter()
            .filter(|record| record.learner_id == learner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.played_at.cmp(&a.played_at));
        records.truncate(limit);
        Ok(records)
    }

    fn game_records_by_type(
        &self,
        game_type: GameType,
        limit: usize,
    ) -> Result<Vec<GameRecord>, StoreError> {
        let inner = self.inner.read();
        let mut records: Vec<GameRecord> = inner
            .games
            .iter()
            .filter(|record| record.game_type == game_type)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.score.cmp(&a.score));
        records.truncate(limit);
        Ok(records)
    }

    fn progress_summary(&self, learner_id: &str) -> Result<ProgressSummary, StoreError> {
        let inner = self.inner.read();
        let mut summary = ProgressSummary::default();
        for progress in inner.progress.values() {
            if progress.learner_id != learner_id {
                continue;
            }
            summary.total_words += 1;
            summary.correct_total += progress.correct_count as i64;
            summary.wrong_total += progress.wrong_count as i64;
            match progress.status {
                WordStatus::Learning => summary.learning_words += 1,
                WordStatus::Mastered => summary.mastered_words += 1,
                WordStatus::New => {}
            }
        }
        Ok(summary)
    }

    fn put_learner(&self, account: LearnerAccount) -> Result<(), StoreError> {
        self.inner
            .write()
            .learners
            .insert(account.id.clone(), account);
        Ok(())
    }

    fn put_item(&self, item: VocabularyItem) -> Result<(), StoreError> {
        self.inner.write().items.insert(item.id.clone(), item);
        Ok(())
    }
}
