use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::GameType;

/// Fixed exp/coin grant for a single event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardDelta {
    pub exp: i64,
    pub coins: i64,
}

/// Rewards for review answers. Incorrect answers still earn a little exp so
/// a failed session is not a zero session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRewardPolicy {
    pub correct: RewardDelta,
    pub incorrect: RewardDelta,
}

impl Default for ReviewRewardPolicy {
    fn default() -> Self {
        Self {
            correct: RewardDelta { exp: 10, coins: 1 },
            incorrect: RewardDelta { exp: 2, coins: 0 },
        }
    }
}

/// Promotion rule for `WordStatus::Mastered`: at least `min_correct` correct
/// answers and lifetime accuracy of `min_accuracy` or better. A
/// `min_correct` of 0 disables promotion entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryRule {
    pub min_correct: i32,
    pub min_accuracy: f64,
}

impl Default for MasteryRule {
    fn default() -> Self {
        Self {
            min_correct: 5,
            min_accuracy: 0.8,
        }
    }
}

impl MasteryRule {
    pub fn is_met(&self, correct_count: i32, wrong_count: i32) -> bool {
        if self.min_correct == 0 {
            return false;
        }
        let total = correct_count + wrong_count;
        if correct_count < self.min_correct || total == 0 {
            return false;
        }
        correct_count as f64 / total as f64 >= self.min_accuracy
    }
}

/// Per-game reward shape: full `exp_reward`/`coin_reward` at `max_score`,
/// scaled down proportionally below it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRewardConfig {
    pub exp_reward: i64,
    pub coin_reward: i64,
    pub max_score: i64,
}

/// Enumerated game configuration, resolved once at startup. Unknown game
/// types are rejected at lookup instead of failing deep in the arithmetic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameCatalog {
    entries: HashMap<GameType, GameRewardConfig>,
}

impl Default for GameCatalog {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            GameType::Sprint,
            GameRewardConfig {
                exp_reward: 50,
                coin_reward: 10,
                max_score: 100,
            },
        );
        entries.insert(
            GameType::Target,
            GameRewardConfig {
                exp_reward: 60,
                coin_reward: 15,
                max_score: 100,
            },
        );
        entries.insert(
            GameType::Match,
            GameRewardConfig {
                exp_reward: 40,
                coin_reward: 8,
                max_score: 50,
            },
        );
        entries.insert(
            GameType::Quiz,
            GameRewardConfig {
                exp_reward: 30,
                coin_reward: 5,
                max_score: 30,
            },
        );
        Self { entries }
    }
}

impl GameCatalog {
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, game_type: GameType) -> Option<&GameRewardConfig> {
        self.entries.get(&game_type)
    }

    pub fn insert(&mut self, game_type: GameType, config: GameRewardConfig) {
        self.entries.insert(game_type, config);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionConfig {
    pub review_rewards: ReviewRewardPolicy,
    pub mastery: MasteryRule,
    pub games: GameCatalog,
    /// How many times an event is retried on commit conflict before the
    /// conflict is surfaced to the caller.
    pub max_commit_retries: u32,
    /// Hard cap applied to `due_cards` limits.
    pub max_due_limit: usize,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            review_rewards: ReviewRewardPolicy::default(),
            mastery: MasteryRule::default(),
            games: GameCatalog::default(),
            max_commit_retries: 3,
            max_due_limit: 100,
        }
    }
}

impl ProgressionConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(value) = env_parse::<i32>("MASTERY_MIN_CORRECT") {
            config.mastery.min_correct = value.max(0);
        }
        if let Some(value) = env_parse::<f64>("MASTERY_MIN_ACCURACY") {
            config.mastery.min_accuracy = value.clamp(0.0, 1.0);
        }
        if let Some(value) = env_parse::<i64>("REVIEW_EXP_CORRECT") {
            config.review_rewards.correct.exp = value.max(0);
        }
        if let Some(value) = env_parse::<i64>("REVIEW_EXP_INCORRECT") {
            config.review_rewards.incorrect.exp = value.max(0);
        }
        if let Some(value) = env_parse::<u32>("MAX_COMMIT_RETRIES") {
            config.max_commit_retries = value;
        }

        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<T>().ok())
}
