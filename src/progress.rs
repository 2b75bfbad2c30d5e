use chrono::{DateTime, Utc};

use crate::config::MasteryRule;
use crate::types::{WordProgress, WordStatus};

/// Record one answer against a learner's per-word progress.
///
/// The row is created lazily in `learning` status on the first answer.
/// Counters only ever grow, and promotion to `mastered` happens when the
/// configured rule is met; a mastered word never demotes.
pub fn apply_answer(
    learner_id: &str,
    item_id: &str,
    progress: Option<WordProgress>,
    correct: bool,
    now: DateTime<Utc>,
    rule: &MasteryRule,
) -> WordProgress {
    let mut progress = progress.unwrap_or(WordProgress {
        learner_id: learner_id.to_string(),
        item_id: item_id.to_string(),
        status: WordStatus::Learning,
        correct_count: 0,
        wrong_count: 0,
        last_review_at: None,
    });

    if progress.status == WordStatus::New {
        progress.status = WordStatus::Learning;
    }

    if correct {
        progress.correct_count += 1;
    } else {
        progress.wrong_count += 1;
    }
    progress.last_review_at = Some(now);

    if progress.status != WordStatus::Mastered
        && rule.is_met(progress.correct_count, progress.wrong_count)
    {
        progress.status = WordStatus::Mastered;
    }

    progress
}
