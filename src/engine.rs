use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ProgressionConfig;
use crate::daily::{self, DailyDelta};
use crate::error::CoreError;
use crate::progress;
use crate::reward::{self, RewardOutcome};
use crate::scheduler;
use crate::store::{EventCommit, ProgressionStore};
use crate::types::{
    DailyStat, GameRecord, GameType, LearnerAccount, MistakeCategory, ReviewCard, VocabularyItem,
    WordProgress, WrongBookEntry,
};
use crate::wrongbook::{self, WrongBookStats};

/// Quality assumed when a transport only reports correctness.
const DEFAULT_PASS_QUALITY: i32 = 4;
const DEFAULT_FAIL_QUALITY: i32 = 1;

// ========== Submissions ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    pub learner_id: String,
    pub item_id: String,
    /// 0–5 recall confidence; defaults from `correct` when absent.
    pub quality: Option<i32>,
    pub correct: bool,
    /// Miss reason filed to the wrong book for incorrect answers.
    pub category: Option<MistakeCategory>,
    pub now: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameItemResult {
    pub item_id: String,
    pub correct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSubmission {
    pub learner_id: String,
    pub game_type: GameType,
    pub score: i64,
    pub per_item_results: Vec<GameItemResult>,
    pub now: DateTime<Utc>,
}

// ========== Outcomes ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub exp_earned: i64,
    pub coins_earned: i64,
    pub leveled_up: bool,
    pub new_level: i32,
    pub card: ReviewCard,
    pub progress: WordProgress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrong_entry: Option<WrongBookEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameOutcome {
    pub score: i64,
    pub exp_earned: i64,
    pub coins_earned: i64,
    pub leveled_up: bool,
    pub new_level: i32,
}

// ========== Read models ==========

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCard {
    pub item: VocabularyItem,
    pub interval_days: i64,
    pub repetitions: i32,
    pub next_review: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongBookWord {
    pub id: String,
    pub item_id: String,
    pub word: String,
    pub phonetic: String,
    pub meaning: String,
    pub wrong_count: i32,
    pub last_wrong_at: DateTime<Utc>,
    pub category: MistakeCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerSummary {
    pub id: String,
    pub nickname: String,
    pub level: i32,
    pub exp: i64,
    pub coins: i64,
    pub streak: i32,
    pub words_learned: i64,
    pub mastered_words: i64,
    pub wrong_words: i64,
    pub games_played: i64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardRow {
    pub learner_id: String,
    pub nickname: String,
    pub score: i64,
    pub played_at: DateTime<Utc>,
}

// ========== Engine ==========

/// Orchestrates one learning event end-to-end: scheduler, progress tracker,
/// wrong book, rewards and daily counters, committed to the store as a
/// single atomic unit.
///
/// Events for the same learner are serialized through a per-learner lock,
/// so concurrent submissions linearize instead of losing increments; events
/// for different learners run in parallel. If the store still reports a
/// conflicting write, the whole event is recomputed and retried up to the
/// configured bound before `Conflict` reaches the caller.
pub struct ProgressionEngine {
    config: ProgressionConfig,
    store: Arc<dyn ProgressionStore>,
    learner_locks: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ProgressionEngine {
    pub fn new(config: ProgressionConfig, store: Arc<dyn ProgressionStore>) -> Self {
        Self {
            config,
            store,
            learner_locks: parking_lot::Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<dyn ProgressionStore> {
        Arc::clone(&self.store)
    }

    fn learner_lock(&self, learner_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.learner_locks.lock();
        locks
            .entry(learner_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ----- review events -----

    pub async fn submit_review(
        &self,
        submission: ReviewSubmission,
    ) -> Result<ReviewOutcome, CoreError> {
        let quality = submission.quality.unwrap_or(if submission.correct {
            DEFAULT_PASS_QUALITY
        } else {
            DEFAULT_FAIL_QUALITY
        });
        if !(scheduler::MIN_QUALITY..=scheduler::MAX_QUALITY).contains(&quality) {
            return Err(CoreError::validation(format!(
                "quality must be between {} and {}, got {quality}",
                scheduler::MIN_QUALITY,
                scheduler::MAX_QUALITY
            )));
        }

        let lock = self.learner_lock(&submission.learner_id);
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            match self.apply_review(&submission, quality) {
                Err(CoreError::Conflict(message))
                    if attempt < self.config.max_commit_retries =>
                {
                    attempt += 1;
                    tracing::warn!(
                        learner_id = %submission.learner_id,
                        attempt,
                        %message,
                        "review event conflicted, retrying"
                    );
                }
                result => return result,
            }
        }
    }

    fn apply_review(
        &self,
        submission: &ReviewSubmission,
        quality: i32,
    ) -> Result<ReviewOutcome, CoreError> {
        let learner_id = submission.learner_id.as_str();
        let item_id = submission.item_id.as_str();
        let now = submission.now;

        let mut account = self.load_learner(learner_id)?;
        let version = self.store.learner_version(learner_id)?;
        if self.store.item(item_id)?.is_none() {
            return Err(CoreError::not_found(format!("word not found: {item_id}")));
        }

        let card = scheduler::apply_outcome(
            learner_id,
            item_id,
            self.store.card(learner_id, item_id)?,
            quality,
            now,
        )?;
        let progress = progress::apply_answer(
            learner_id,
            item_id,
            self.store.progress(learner_id, item_id)?,
            submission.correct,
            now,
            &self.config.mastery,
        );

        let wrong_entry = if submission.correct {
            None
        } else {
            Some(wrongbook::apply_miss(
                learner_id,
                item_id,
                self.store.wrong_entry(learner_id, item_id)?,
                submission.category.unwrap_or_default(),
                now,
            ))
        };

        let delta = if submission.correct {
            self.config.review_rewards.correct
        } else {
            self.config.review_rewards.incorrect
        };
        let reward_outcome = reward::apply_reward(&mut account, delta.exp, delta.coins)?;

        let daily = self.accumulate(
            learner_id,
            now,
            &DailyDelta {
                words_learned: if submission.correct { 1 } else { 0 },
                games_played: 0,
                exp_earned: delta.exp,
                coins_earned: delta.coins,
            },
        )?;
        account.streak = self.refreshed_streak(learner_id, daily.date)?;

        self.store.commit(EventCommit {
            learner_id: learner_id.to_string(),
            expected_version: Some(version),
            account: Some(account),
            progress: Some(progress.clone()),
            card: Some(card.clone()),
            wrong_entries: wrong_entry.clone().into_iter().collect(),
            daily: Some(daily),
            game_record: None,
        })?;

        tracing::debug!(
            learner_id,
            item_id,
            correct = submission.correct,
            quality,
            interval_days = card.interval_days,
            "review event applied"
        );

        Ok(ReviewOutcome {
            exp_earned: delta.exp,
            coins_earned: delta.coins,
            leveled_up: reward_outcome.leveled_up,
            new_level: reward_outcome.new_level,
            card,
            progress,
            wrong_entry,
        })
    }

    // ----- game events -----

    pub async fn submit_game(&self, submission: GameSubmission) -> Result<GameOutcome, CoreError> {
        let game_config = *self
            .config
            .games
            .get(submission.game_type)
            .ok_or_else(|| {
                CoreError::not_found(format!(
                    "unknown game type: {}",
                    submission.game_type.as_str()
                ))
            })?;
        let game_reward = reward::game_reward(&game_config, submission.score)?;

        let lock = self.learner_lock(&submission.learner_id);
        let _guard = lock.lock().await;

        let mut attempt = 0;
        loop {
            match self.apply_game(&submission, &game_reward) {
                Err(CoreError::Conflict(message))
                    if attempt < self.config.max_commit_retries =>
                {
                    attempt += 1;
                    tracing::warn!(
                        learner_id = %submission.learner_id,
                        attempt,
                        %message,
                        "game event conflicted, retrying"
                    );
                }
                result => return result,
            }
        }
    }

    fn apply_game(
        &self,
        submission: &GameSubmission,
        game_reward: &reward::GameReward,
    ) -> Result<GameOutcome, CoreError> {
        let learner_id = submission.learner_id.as_str();
        let now = submission.now;

        let mut account = self.load_learner(learner_id)?;
        let version = self.store.learner_version(learner_id)?;

        // A game may miss the same word more than once; later misses chain
        // onto the entry produced earlier in this event.
        let mut wrong_entries: HashMap<String, WrongBookEntry> = HashMap::new();
        for result in &submission.per_item_results {
            if result.correct {
                continue;
            }
            let existing = match wrong_entries.remove(&result.item_id) {
                Some(entry) => Some(entry),
                None => self.store.wrong_entry(learner_id, &result.item_id)?,
            };
            let entry = wrongbook::apply_miss(
                learner_id,
                &result.item_id,
                existing,
                MistakeCategory::Spelling,
                now,
            );
            wrong_entries.insert(result.item_id.clone(), entry);
        }

        let reward_outcome: RewardOutcome = reward::apply_reward(
            &mut account,
            game_reward.exp_earned,
            game_reward.coins_earned,
        )?;

        let daily = self.accumulate(
            learner_id,
            now,
            &DailyDelta {
                words_learned: 0,
                games_played: 1,
                exp_earned: game_reward.exp_earned,
                coins_earned: game_reward.coins_earned,
            },
        )?;
        account.streak = self.refreshed_streak(learner_id, daily.date)?;

        let record = GameRecord {
            id: uuid::Uuid::new_v4().to_string(),
            learner_id: learner_id.to_string(),
            game_type: submission.game_type,
            score: submission.score,
            exp_earned: game_reward.exp_earned,
            coins_earned: game_reward.coins_earned,
            played_at: now,
        };

        self.store.commit(EventCommit {
            learner_id: learner_id.to_string(),
            expected_version: Some(version),
            account: Some(account),
            progress: None,
            card: None,
            wrong_entries: wrong_entries.into_values().collect(),
            daily: Some(daily),
            game_record: Some(record),
        })?;

        tracing::debug!(
            learner_id,
            game_type = submission.game_type.as_str(),
            score = submission.score,
            exp_earned = game_reward.exp_earned,
            "game event applied"
        );

        Ok(GameOutcome {
            score: submission.score,
            exp_earned: game_reward.exp_earned,
            coins_earned: game_reward.coins_earned,
            leveled_up: reward_outcome.leveled_up,
            new_level: reward_outcome.new_level,
        })
    }

    // ----- shared event steps -----

    fn load_learner(&self, learner_id: &str) -> Result<LearnerAccount, CoreError> {
        self.store
            .learner(learner_id)?
            .ok_or_else(|| CoreError::not_found(format!("learner not found: {learner_id}")))
    }

    fn accumulate(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
        delta: &DailyDelta,
    ) -> Result<DailyStat, CoreError> {
        let date = now.date_naive();
        let existing = self.store.daily_stat(learner_id, date)?;
        Ok(daily::apply_delta(learner_id, date, existing, delta))
    }

    fn refreshed_streak(
        &self,
        learner_id: &str,
        today: chrono::NaiveDate,
    ) -> Result<i32, CoreError> {
        let mut active_days = self.store.active_days(learner_id)?;
        active_days.insert(today);
        Ok(daily::streak_ending_at(&active_days, today))
    }

    // ----- queries -----

    /// Cards due at `now`, oldest due date first, joined with their catalog
    /// entries. This is the read contract the learning-session UI consumes.
    pub async fn due_cards(
        &self,
        learner_id: &str,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<DueCard>, CoreError> {
        let limit = limit.min(self.config.max_due_limit);
        let cards = self.store.due_cards(learner_id, now, limit)?;
        let mut due = Vec::with_capacity(cards.len());
        for card in cards {
            match self.store.item(&card.item_id)? {
                Some(item) => due.push(DueCard {
                    item,
                    interval_days: card.interval_days,
                    repetitions: card.repetitions,
                    next_review: card.next_review,
                }),
                None => {
                    tracing::warn!(item_id = %card.item_id, "due card references missing word");
                }
            }
        }
        Ok(due)
    }

    pub async fn wrong_book(
        &self,
        learner_id: &str,
        category: Option<MistakeCategory>,
    ) -> Result<Vec<WrongBookWord>, CoreError> {
        let entries = self.store.wrong_entries(learner_id, category)?;
        let mut words = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.store.item(&entry.item_id)? {
                Some(item) => words.push(WrongBookWord {
                    id: entry.id,
                    item_id: entry.item_id,
                    word: item.word,
                    phonetic: item.phonetic,
                    meaning: item.meaning,
                    wrong_count: entry.wrong_count,
                    last_wrong_at: entry.last_wrong_at,
                    category: entry.category,
                }),
                None => {
                    tracing::warn!(item_id = %entry.item_id, "wrong-book entry references missing word");
                }
            }
        }
        Ok(words)
    }

    pub async fn wrong_book_stats(&self, learner_id: &str) -> Result<WrongBookStats, CoreError> {
        let entries = self.store.wrong_entries(learner_id, None)?;
        Ok(wrongbook::stats(&entries))
    }

    pub async fn remove_wrong_entry(&self, entry_id: &str) -> Result<(), CoreError> {
        if self.store.remove_wrong_entry(entry_id)? {
            Ok(())
        } else {
            Err(CoreError::not_found(format!(
                "wrong-book entry not found: {entry_id}"
            )))
        }
    }

    pub async fn clear_wrong_book(&self, learner_id: &str) -> Result<u64, CoreError> {
        let removed = self.store.clear_wrong_entries(learner_id)?;
        tracing::debug!(learner_id, removed, "wrong book cleared");
        Ok(removed)
    }

    pub async fn daily_stats(
        &self,
        learner_id: &str,
        days: usize,
    ) -> Result<Vec<DailyStat>, CoreError> {
        Ok(self.store.daily_stats(learner_id, days)?)
    }

    pub async fn learner_summary(&self, learner_id: &str) -> Result<LearnerSummary, CoreError> {
        let account = self.load_learner(learner_id)?;
        let progress = self.store.progress_summary(learner_id)?;
        let wrong_words = self.store.wrong_entries(learner_id, None)?.len() as i64;
        let games_played = self.store.game_records(learner_id, usize::MAX)?.len() as i64;

        let answered = progress.correct_total + progress.wrong_total;
        let accuracy = if answered == 0 {
            0.0
        } else {
            progress.correct_total as f64 / answered as f64
        };

        Ok(LearnerSummary {
            id: account.id,
            nickname: account.nickname,
            level: account.level,
            exp: account.exp,
            coins: account.coins,
            streak: account.streak,
            words_learned: progress.total_words,
            mastered_words: progress.mastered_words,
            wrong_words,
            games_played,
            accuracy,
        })
    }

    pub async fn game_history(
        &self,
        learner_id: &str,
        limit: usize,
    ) -> Result<Vec<GameRecord>, CoreError> {
        Ok(self.store.game_records(learner_id, limit)?)
    }

    /// Best score per learner for one game type, highest first.
    pub async fn leaderboard(
        &self,
        game_type: GameType,
        limit: usize,
    ) -> Result<Vec<LeaderboardRow>, CoreError> {
        let records = self.store.game_records_by_type(game_type, usize::MAX)?;

        let mut best: HashMap<String, GameRecord> = HashMap::new();
        for record in records {
            match best.get(&record.learner_id) {
                Some(current) if current.score >= record.score => {}
                _ => {
                    best.insert(record.learner_id.clone(), record);
                }
            }
        }

        let mut rows = Vec::with_capacity(best.len());
        for record in best.into_values() {
            match self.store.learner(&record.learner_id)? {
                Some(account) => rows.push(LeaderboardRow {
                    learner_id: record.learner_id,
                    nickname: account.nickname,
                    score: record.score,
                    played_at: record.played_at,
                }),
                None => {
                    tracing::warn!(learner_id = %record.learner_id, "game record references missing learner");
                }
            }
        }
        rows.sort_by(|a, b| b.score.cmp(&a.score).then(a.played_at.cmp(&b.played_at)));
        rows.truncate(limit);
        Ok(rows)
    }
}
