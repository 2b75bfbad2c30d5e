use serde::{Deserialize, Serialize};

use crate::config::GameRewardConfig;
use crate::error::CoreError;
use crate::types::LearnerAccount;

/// Experience needed per level; level is derived, never stored ahead of exp.
pub const EXP_PER_LEVEL: i64 = 100;

pub fn level_for_exp(exp: i64) -> i32 {
    (exp / EXP_PER_LEVEL) as i32 + 1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardOutcome {
    pub new_exp: i64,
    pub new_level: i32,
    pub leveled_up: bool,
}

/// The single owner of the exp/coins/level read-modify-write. Every caller
/// that grants rewards funnels through here, so the leveling formula lives
/// in exactly one place.
pub fn apply_reward(
    account: &mut LearnerAccount,
    exp_delta: i64,
    coin_delta: i64,
) -> Result<RewardOutcome, CoreError> {
    if exp_delta < 0 || coin_delta < 0 {
        return Err(CoreError::validation(
            "reward deltas must be non-negative",
        ));
    }

    let new_exp = account.exp + exp_delta;
    let new_level = level_for_exp(new_exp);
    let leveled_up = new_level > account.level;

    account.exp = new_exp;
    account.level = new_level;
    account.coins += coin_delta;

    Ok(RewardOutcome {
        new_exp,
        new_level,
        leveled_up,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameReward {
    pub exp_earned: i64,
    pub coins_earned: i64,
}

/// Score-proportional game reward: full grant at `max_score`, rounded
/// linear scale below it. Scores outside `[0, max_score]` are rejected
/// before anything is mutated.
pub fn game_reward(config: &GameRewardConfig, score: i64) -> Result<GameReward, CoreError> {
    if score < 0 || score > config.max_score {
        return Err(CoreError::validation(format!(
            "score must be between 0 and {}, got {score}",
            config.max_score
        )));
    }

    let ratio = score as f64 / config.max_score as f64;
    Ok(GameReward {
        exp_earned: (config.exp_reward as f64 * ratio).round() as i64,
        coins_earned: (config.coin_reward as f64 * ratio).round() as i64,
    })
}
