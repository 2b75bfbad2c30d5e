use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ========== Enums ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum WordStatus {
    #[default]
    New,
    Learning,
    Mastered,
}

impl WordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Learning => "learning",
            Self::Mastered => "mastered",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "learning" => Self::Learning,
            "mastered" => Self::Mastered,
            _ => Self::New,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum MistakeCategory {
    #[default]
    Spelling,
    Listening,
    Reading,
    Grammar,
}

impl MistakeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spelling => "spelling",
            Self::Listening => "listening",
            Self::Reading => "reading",
            Self::Grammar => "grammar",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "listening" => Self::Listening,
            "reading" => Self::Reading,
            "grammar" => Self::Grammar,
            _ => Self::Spelling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Sprint,
    Target,
    Match,
    Quiz,
}

impl GameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sprint => "sprint",
            Self::Target => "target",
            Self::Match => "match",
            Self::Quiz => "quiz",
        }
    }

    /// Unlike the other enums there is no safe default for a game type, so
    /// unknown names stay unresolved and the caller rejects them.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sprint" => Some(Self::Sprint),
            "target" => Some(Self::Target),
            "match" => Some(Self::Match),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }
}

// ========== Entities ==========

/// Per-learner account counters. `exp` and `coins` only ever grow through
/// the reward path; `level` is derived from `exp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerAccount {
    pub id: String,
    pub nickname: String,
    pub exp: i64,
    pub level: i32,
    pub coins: i64,
    pub streak: i32,
    pub created_at: DateTime<Utc>,
}

impl LearnerAccount {
    pub fn new(id: impl Into<String>, nickname: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            nickname: nickname.into(),
            exp: 0,
            level: 1,
            coins: 0,
            streak: 0,
            created_at: now,
        }
    }
}

/// Catalog entry. Owned by an external word catalog; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub id: String,
    pub word: String,
    pub phonetic: String,
    pub meaning: String,
    pub example: String,
    pub level: String,
    pub category: String,
}

/// One row per learner and word, created lazily on the first recorded
/// answer. Counters are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordProgress {
    pub learner_id: String,
    pub item_id: String,
    pub status: WordStatus,
    pub correct_count: i32,
    pub wrong_count: i32,
    pub last_review_at: Option<DateTime<Utc>>,
}

impl WordProgress {
    /// Lifetime share of correct answers; 0.0 before any answer.
    pub fn accuracy(&self) -> f64 {
        let total = self.correct_count + self.wrong_count;
        if total == 0 {
            return 0.0;
        }
        self.correct_count as f64 / total as f64
    }
}

/// Spaced-repetition card. Exists only once a word has been reviewed.
/// Invariant: `next_review` is the computation time plus `interval_days`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCard {
    pub learner_id: String,
    pub item_id: String,
    pub interval_days: i64,
    pub ease_factor: f64,
    pub repetitions: i32,
    pub next_review: DateTime<Utc>,
}

/// Deduplicated wrong-word record, unique per (learner, item). `category`
/// is the last observed miss reason, not a set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongBookEntry {
    pub id: String,
    pub learner_id: String,
    pub item_id: String,
    pub wrong_count: i32,
    pub last_wrong_at: DateTime<Utc>,
    pub category: MistakeCategory,
}

/// Per-learner per-UTC-day counters. Rows for past days are never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStat {
    pub learner_id: String,
    pub date: NaiveDate,
    pub words_learned: i32,
    pub games_played: i32,
    pub exp_earned: i64,
    pub coins_earned: i64,
}

/// Write-only read-model of one finished game, consumed by history and
/// leaderboard queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub learner_id: String,
    pub game_type: GameType,
    pub score: i64,
    pub exp_earned: i64,
    pub coins_earned: i64,
    pub played_at: DateTime<Utc>,
}
