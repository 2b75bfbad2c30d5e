use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::DailyStat;

/// Increments one event contributes to a learner's day row. Absent fields
/// stay zero, so callers only name what actually happened.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyDelta {
    pub words_learned: i32,
    pub games_played: i32,
    pub exp_earned: i64,
    pub coins_earned: i64,
}

/// Upsert one day's counters: the row is created with the deltas as initial
/// values, or each delta is added to the existing counters. The caller keys
/// the row by the event's UTC calendar date, so rows for past days are
/// never touched.
pub fn apply_delta(
    learner_id: &str,
    date: NaiveDate,
    stat: Option<DailyStat>,
    delta: &DailyDelta,
) -> DailyStat {
    let mut stat = stat.unwrap_or(DailyStat {
        learner_id: learner_id.to_string(),
        date,
        words_learned: 0,
        games_played: 0,
        exp_earned: 0,
        coins_earned: 0,
    });

    stat.words_learned += delta.words_learned;
    stat.games_played += delta.games_played;
    stat.exp_earned += delta.exp_earned;
    stat.coins_earned += delta.coins_earned;
    stat
}

/// Consecutive-day activity streak ending at `today`: counts back from
/// `today` while each day has a recorded row. A learner with no row today
/// has a streak of 0.
pub fn streak_ending_at(active_days: &HashSet<NaiveDate>, today: NaiveDate) -> i32 {
    let mut streak = 0;
    let mut day = today;
    while active_days.contains(&day) {
        streak += 1;
        day -= Duration::days(1);
    }
    streak
}
