use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{MistakeCategory, WrongBookEntry};

/// Entries with this many misses or more count as serious.
pub const SERIOUS_WRONG_COUNT: i32 = 3;

/// Record one miss. Entries are deduplicated per (learner, item): the first
/// miss creates the row, later misses increment it and overwrite both the
/// timestamp and the category with the latest observed reason.
pub fn apply_miss(
    learner_id: &str,
    item_id: &str,
    entry: Option<WrongBookEntry>,
    category: MistakeCategory,
    now: DateTime<Utc>,
) -> WrongBookEntry {
    match entry {
        Some(mut entry) => {
            entry.wrong_count += 1;
            entry.last_wrong_at = now;
            entry.category = category;
            entry
        }
        None => WrongBookEntry {
            id: uuid::Uuid::new_v4().to_string(),
            learner_id: learner_id.to_string(),
            item_id: item_id.to_string(),
            wrong_count: 1,
            last_wrong_at: now,
            category,
        },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: MistakeCategory,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongBookStats {
    pub total: i64,
    pub serious_count: i64,
    pub counts_by_category: Vec<CategoryCount>,
}

/// Aggregate the current entries. No caching: the caller passes the latest
/// snapshot and gets the matching numbers.
pub fn stats(entries: &[WrongBookEntry]) -> WrongBookStats {
    let mut by_category = std::collections::BTreeMap::new();
    let mut serious_count = 0_i64;

    for entry in entries {
        *by_category.entry(entry.category).or_insert(0_i64) += 1;
        if entry.wrong_count >= SERIOUS_WRONG_COUNT {
            serious_count += 1;
        }
    }

    WrongBookStats {
        total: entries.len() as i64,
        serious_count,
        counts_by_category: by_category
            .into_iter()
            .map(|(category, count)| CategoryCount { category, count })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn miss(entry: Option<WrongBookEntry>, category: MistakeCategory) -> WrongBookEntry {
        apply_miss("u1", "w1", entry, category, Utc::now())
    }

    #[test]
    fn first_miss_creates_entry_with_count_one() {
        let entry = miss(None, MistakeCategory::Spelling);
        assert_eq!(entry.wrong_count, 1);
        assert_eq!(entry.category, MistakeCategory::Spelling);
    }

    #[test]
    fn repeat_miss_increments_and_overwrites_category() {
        let first = miss(None, MistakeCategory::Spelling);
        let id = first.id.clone();
        let second = miss(Some(first), MistakeCategory::Listening);
        assert_eq!(second.wrong_count, 2);
        assert_eq!(second.category, MistakeCategory::Listening);
        assert_eq!(second.id, id, "upsert keeps the row identity");
    }

    #[test]
    fn stats_counts_serious_and_categories() {
        let mut entries = vec![miss(None, MistakeCategory::Spelling)];
        let mut repeated = apply_miss("u1", "w2", None, MistakeCategory::Grammar, Utc::now());
        for _ in 0..2 {
            repeated = apply_miss("u1", "w2", Some(repeated), MistakeCategory::Grammar, Utc::now());
        }
        entries.push(repeated);

        let stats = stats(&entries);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.serious_count, 1);
        assert_eq!(
            stats.counts_by_category,
            vec![
                CategoryCount { category: MistakeCategory::Spelling, count: 1 },
                CategoryCount { category: MistakeCategory::Grammar, count: 1 },
            ]
        );
    }
}
