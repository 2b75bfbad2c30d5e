use chrono::{DateTime, Duration, Utc};

use crate::error::CoreError;
use crate::types::ReviewCard;

pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const MIN_QUALITY: i32 = 0;
pub const MAX_QUALITY: i32 = 5;

/// Quality band: 3 and above counts as a successful recall.
pub const PASS_QUALITY: i32 = 3;

/// Apply one recall outcome to a card, fixed-point SM-2.
///
/// `quality` is the 0–5 recall confidence (5 = perfect recall, 0 = total
/// blackout). A missing card materializes as `{interval: 1, ease: 2.5,
/// repetitions: 0}` before the update. The result is a pure function of
/// (existing card, quality, now); calling again with a later `now` is a new
/// scheduling decision, not a replay.
pub fn apply_outcome(
    learner_id: &str,
    item_id: &str,
    card: Option<ReviewCard>,
    quality: i32,
    now: DateTime<Utc>,
) -> Result<ReviewCard, CoreError> {
    if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
        return Err(CoreError::validation(format!(
            "quality must be between {MIN_QUALITY} and {MAX_QUALITY}, got {quality}"
        )));
    }

    let card = card.unwrap_or(ReviewCard {
        learner_id: learner_id.to_string(),
        item_id: item_id.to_string(),
        interval_days: 1,
        ease_factor: DEFAULT_EASE_FACTOR,
        repetitions: 0,
        next_review: now,
    });

    let (interval_days, repetitions) = if quality >= PASS_QUALITY {
        let interval = match card.repetitions {
            0 => 1,
            1 => 3,
            _ => schedule_interval(card.interval_days, card.ease_factor),
        };
        (interval, card.repetitions + 1)
    } else {
        (1, 0)
    };

    Ok(ReviewCard {
        learner_id: card.learner_id,
        item_id: card.item_id,
        interval_days,
        ease_factor: next_ease_factor(card.ease_factor, quality),
        repetitions,
        next_review: now + Duration::days(interval_days),
    })
}

/// Grown interval after a repeated success, rounded to whole days.
fn schedule_interval(interval_days: i64, ease_factor: f64) -> i64 {
    ((interval_days as f64 * ease_factor).round() as i64).max(1)
}

/// Ease-factor update, applied on every outcome, pass or fail.
fn next_ease_factor(ease_factor: f64, quality: i32) -> f64 {
    let miss = (MAX_QUALITY - quality) as f64;
    (ease_factor + (0.1 - miss * (0.08 + miss * 0.02))).max(MIN_EASE_FACTOR)
}
