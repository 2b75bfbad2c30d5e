//! End-to-end tests for the progression engine: one event updates the card,
//! the progress row, the wrong book, the account and the day counters as a
//! single unit, and concurrent submissions for one learner never lose
//! increments.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use vocab_progression::config::{GameCatalog, ProgressionConfig};
use vocab_progression::engine::{
    GameItemResult, GameSubmission, ProgressionEngine, ReviewSubmission,
};
use vocab_progression::error::CoreError;
use vocab_progression::store::{MemoryStore, ProgressionStore};
use vocab_progression::types::{
    GameType, LearnerAccount, MistakeCategory, VocabularyItem, WordStatus,
};

fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
}

fn seed_word(store: &MemoryStore, id: &str, word: &str) {
    store
        .put_item(VocabularyItem {
            id: id.to_string(),
            word: word.to_string(),
            phonetic: format!("/{word}/"),
            meaning: format!("meaning of {word}"),
            example: format!("An example with {word}."),
            level: "KET".to_string(),
            category: "general".to_string(),
        })
        .unwrap();
}

fn setup() -> (Arc<ProgressionEngine>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store
        .put_learner(LearnerAccount::new("u1", "tester", fixed_now()))
        .unwrap();
    for (id, word) in [("w1", "apple"), ("w2", "book"), ("w3", "car"), ("w4", "dog")] {
        seed_word(&store, id, word);
    }
    let engine = Arc::new(ProgressionEngine::new(
        ProgressionConfig::default(),
        Arc::clone(&store) as Arc<dyn ProgressionStore>,
    ));
    (engine, store)
}

fn review(learner: &str, item: &str, correct: bool, now: DateTime<Utc>) -> ReviewSubmission {
    ReviewSubmission {
        learner_id: learner.to_string(),
        item_id: item.to_string(),
        quality: None,
        correct,
        category: None,
        now,
    }
}

fn game(
    learner: &str,
    game_type: GameType,
    score: i64,
    results: Vec<(&str, bool)>,
    now: DateTime<Utc>,
) -> GameSubmission {
    GameSubmission {
        learner_id: learner.to_string(),
        game_type,
        score,
        per_item_results: results
            .into_iter()
            .map(|(item_id, correct)| GameItemResult {
                item_id: item_id.to_string(),
                correct,
            })
            .collect(),
        now,
    }
}

// ============================================================================
// Review events
// ============================================================================

#[tokio::test]
async fn correct_review_updates_every_entity_in_one_event() {
    let (engine, store) = setup();
    let now = fixed_now();

    let outcome = engine.submit_review(review("u1", "w1", true, now)).await.unwrap();

    assert_eq!(outcome.exp_earned, 10);
    assert_eq!(outcome.coins_earned, 1);
    assert_eq!(outcome.new_level, 1);
    assert!(!outcome.leveled_up);
    assert_eq!(outcome.card.repetitions, 1);
    assert_eq!(outcome.card.interval_days, 1);
    assert_eq!(outcome.progress.correct_count, 1);
    assert_eq!(outcome.progress.status, WordStatus::Learning);
    assert!(outcome.wrong_entry.is_none());

    let account = store.learner("u1").unwrap().unwrap();
    assert_eq!(account.exp, 10);
    assert_eq!(account.coins, 1);
    assert_eq!(account.streak, 1);

    let stat = store.daily_stat("u1", now.date_naive()).unwrap().unwrap();
    assert_eq!(stat.words_learned, 1);
    assert_eq!(stat.exp_earned, 10);
    assert_eq!(stat.games_played, 0);
}

#[tokio::test]
async fn incorrect_review_files_wrong_book_and_small_reward() {
    let (engine, store) = setup();
    let now = fixed_now();

    let outcome = engine.submit_review(review("u1", "w1", false, now)).await.unwrap();

    assert_eq!(outcome.exp_earned, 2);
    assert_eq!(outcome.coins_earned, 0);
    assert_eq!(outcome.card.repetitions, 0);
    assert_eq!(outcome.card.interval_days, 1);
    assert_eq!(outcome.progress.wrong_count, 1);

    let entry = outcome.wrong_entry.expect("incorrect answer must file a miss");
    assert_eq!(entry.wrong_count, 1);
    assert_eq!(entry.category, MistakeCategory::Spelling);

    let stat = store.daily_stat("u1", now.date_naive()).unwrap().unwrap();
    assert_eq!(stat.words_learned, 0, "incorrect answers do not count as learned");
    assert_eq!(stat.exp_earned, 2);
}

#[tokio::test]
async fn review_carries_explicit_category_into_wrong_book() {
    let (engine, _) = setup();
    let mut submission = review("u1", "w1", false, fixed_now());
    submission.category = Some(MistakeCategory::Listening);

    let outcome = engine.submit_review(submission).await.unwrap();
    assert_eq!(outcome.wrong_entry.unwrap().category, MistakeCategory::Listening);
}

#[tokio::test]
async fn unknown_learner_and_word_are_rejected_before_mutation() {
    let (engine, store) = setup();
    let now = fixed_now();

    let err = engine.submit_review(review("ghost", "w1", true, now)).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    let err = engine.submit_review(review("u1", "missing", true, now)).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));

    assert_eq!(store.learner("u1").unwrap().unwrap().exp, 0);
    assert!(store.daily_stat("u1", now.date_naive()).unwrap().is_none());
}

#[tokio::test]
async fn out_of_range_quality_is_rejected() {
    let (engine, store) = setup();
    let mut submission = review("u1", "w1", true, fixed_now());
    submission.quality = Some(6);

    let err = engine.submit_review(submission).await.unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));
    assert!(store.card("u1", "w1").unwrap().is_none());
}

#[tokio::test]
async fn repeated_passes_walk_the_interval_ladder() {
    let (engine, store) = setup();
    let mut now = fixed_now();

    for expected_interval in [1, 3] {
        let mut submission = review("u1", "w1", true, now);
        submission.quality = Some(5);
        let outcome = engine.submit_review(submission).await.unwrap();
        assert_eq!(outcome.card.interval_days, expected_interval);
        now += Duration::days(expected_interval);
    }

    let card = store.card("u1", "w1").unwrap().unwrap();
    assert_eq!(card.repetitions, 2);
}

#[tokio::test]
async fn five_accurate_recalls_promote_to_mastered() {
    let (engine, store) = setup();
    let mut now = fixed_now();

    for _ in 0..5 {
        engine.submit_review(review("u1", "w1", true, now)).await.unwrap();
        now += Duration::hours(1);
    }

    let progress = store.progress("u1", "w1").unwrap().unwrap();
    assert_eq!(progress.status, WordStatus::Mastered);
    assert_eq!(progress.correct_count, 5);
}

// ============================================================================
// Game events
// ============================================================================

#[tokio::test]
async fn full_score_sprint_grants_exact_table_rewards() {
    let (engine, store) = setup();
    let now = fixed_now();

    let outcome = engine
        .submit_game(game("u1", GameType::Sprint, 100, vec![], now))
        .await
        .unwrap();

    assert_eq!(outcome.exp_earned, 50);
    assert_eq!(outcome.coins_earned, 10);

    let stat = store.daily_stat("u1", now.date_naive()).unwrap().unwrap();
    assert_eq!(stat.games_played, 1);
    assert_eq!(stat.exp_earned, 50);

    let history = engine.game_history("u1", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].score, 100);
    assert_eq!(history[0].game_type, GameType::Sprint);
}

#[tokio::test]
async fn half_score_target_rounds_rewards_per_component() {
    let (engine, _) = setup();

    let outcome = engine
        .submit_game(game("u1", GameType::Target, 50, vec![], fixed_now()))
        .await
        .unwrap();

    assert_eq!(outcome.exp_earned, 30);
    assert_eq!(outcome.coins_earned, 8);
}

#[tokio::test]
async fn game_reward_can_cross_a_level_boundary() {
    let (engine, store) = setup();
    let mut account = store.learner("u1").unwrap().unwrap();
    account.exp = 90;
    store.put_learner(account).unwrap();

    let outcome = engine
        .submit_game(game("u1", GameType::Target, 100, vec![], fixed_now()))
        .await
        .unwrap();

    assert_eq!(outcome.exp_earned, 60);
    assert!(outcome.leveled_up);
    assert_eq!(outcome.new_level, 2);
    assert_eq!(store.learner("u1").unwrap().unwrap().exp, 150);
}

#[tokio::test]
async fn game_misses_land_in_wrong_book_with_dedup() {
    let (engine, store) = setup();

    engine
        .submit_game(game(
            "u1",
            GameType::Quiz,
            20,
            vec![("w1", false), ("w2", true), ("w1", false), ("w3", false)],
            fixed_now(),
        ))
        .await
        .unwrap();

    let w1 = store.wrong_entry("u1", "w1").unwrap().unwrap();
    assert_eq!(w1.wrong_count, 2, "same word missed twice in one game");
    assert!(store.wrong_entry("u1", "w2").unwrap().is_none());
    assert_eq!(store.wrong_entry("u1", "w3").unwrap().unwrap().wrong_count, 1);
}

#[tokio::test]
async fn out_of_range_score_is_rejected_without_mutation() {
    let (engine, store) = setup();

    let err = engine
        .submit_game(game("u1", GameType::Quiz, 31, vec![("w1", false)], fixed_now()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    let err = engine
        .submit_game(game("u1", GameType::Sprint, -1, vec![], fixed_now()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation(_)));

    assert!(store.wrong_entry("u1", "w1").unwrap().is_none());
    assert_eq!(store.learner("u1").unwrap().unwrap().exp, 0);
}

#[tokio::test]
async fn game_type_missing_from_catalog_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    store
        .put_learner(LearnerAccount::new("u1", "tester", fixed_now()))
        .unwrap();
    let config = ProgressionConfig {
        games: GameCatalog::empty(),
        ..Default::default()
    };
    let engine = ProgressionEngine::new(config, Arc::clone(&store) as Arc<dyn ProgressionStore>);

    let err = engine
        .submit_game(game("u1", GameType::Sprint, 10, vec![], fixed_now()))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn concurrent_correct_reviews_never_lose_an_increment() {
    let (engine, store) = setup();
    let now = fixed_now();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine.submit_review(review("u1", "w1", true, now)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let progress = store.progress("u1", "w1").unwrap().unwrap();
    assert_eq!(progress.correct_count, 10);
    let account = store.learner("u1").unwrap().unwrap();
    assert_eq!(account.exp, 100);
    assert_eq!(account.coins, 10);
    assert_eq!(account.level, 2);
}

#[tokio::test]
async fn two_concurrent_misses_leave_wrong_count_two() {
    let (engine, store) = setup();
    let now = fixed_now();

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.submit_review(review("u1", "w1", false, now)).await })
    };
    let second = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.submit_review(review("u1", "w1", false, now)).await })
    };
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    let entry = store.wrong_entry("u1", "w1").unwrap().unwrap();
    assert_eq!(entry.wrong_count, 2, "never 1: both misses must land");
}

#[tokio::test]
async fn concurrent_game_submissions_accumulate_daily_counters() {
    let (engine, store) = setup();
    let now = fixed_now();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let engine = Arc::clone(&engine);
        handles.push(tokio::spawn(async move {
            engine
                .submit_game(game("u1", GameType::Match, 50, vec![], now))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stat = store.daily_stat("u1", now.date_naive()).unwrap().unwrap();
    assert_eq!(stat.games_played, 5);
    assert_eq!(stat.exp_earned, 200);
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn due_cards_exclude_future_reviews_and_order_ascending() {
    let (engine, _) = setup();
    let start = fixed_now();

    // Answer three words at staggered times; all get next_review = now + 1d.
    for (item, hours_ago) in [("w1", 30), ("w2", 26), ("w3", 28)] {
        engine
            .submit_review(review("u1", item, true, start - Duration::hours(hours_ago)))
            .await
            .unwrap();
    }
    // w4 reviewed just now: due tomorrow, must not appear.
    engine.submit_review(review("u1", "w4", true, start)).await.unwrap();

    let due = engine.due_cards("u1", start, 10).await.unwrap();
    let ids: Vec<&str> = due.iter().map(|card| card.item.id.as_str()).collect();
    assert_eq!(ids, vec!["w1", "w3", "w2"]);
    for card in &due {
        assert!(card.next_review <= start, "due list must never contain future cards");
    }

    let capped = engine.due_cards("u1", start, 2).await.unwrap();
    assert_eq!(capped.len(), 2);
}

#[tokio::test]
async fn wrong_book_lists_join_catalog_and_filter_by_category() {
    let (engine, _) = setup();
    let now = fixed_now();

    let mut listening = review("u1", "w1", false, now);
    listening.category = Some(MistakeCategory::Listening);
    engine.submit_review(listening).await.unwrap();
    engine
        .submit_review(review("u1", "w2", false, now + Duration::minutes(1)))
        .await
        .unwrap();

    let all = engine.wrong_book("u1", None).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].word, "book", "latest miss first");
    assert_eq!(all[1].word, "apple");

    let spelling_only = engine
        .wrong_book("u1", Some(MistakeCategory::Spelling))
        .await
        .unwrap();
    assert_eq!(spelling_only.len(), 1);
    assert_eq!(spelling_only[0].item_id, "w2");
}

#[tokio::test]
async fn wrong_book_stats_track_serious_entries_live() {
    let (engine, _) = setup();
    let mut now = fixed_now();

    for _ in 0..3 {
        engine.submit_review(review("u1", "w1", false, now)).await.unwrap();
        now += Duration::minutes(1);
    }
    engine.submit_review(review("u1", "w2", false, now)).await.unwrap();

    let stats = engine.wrong_book_stats("u1").await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.serious_count, 1);

    engine.clear_wrong_book("u1").await.unwrap();
    let stats = engine.wrong_book_stats("u1").await.unwrap();
    assert_eq!(stats.total, 0, "stats reflect the latest state, no caching");
}

#[tokio::test]
async fn removing_entries_is_immediate_and_checked() {
    let (engine, _) = setup();

    let outcome = engine
        .submit_review(review("u1", "w1", false, fixed_now()))
        .await
        .unwrap();
    let entry_id = outcome.wrong_entry.unwrap().id;

    engine.remove_wrong_entry(&entry_id).await.unwrap();
    let err = engine.remove_wrong_entry(&entry_id).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn streak_counts_consecutive_active_days() {
    let (engine, store) = setup();
    let start = fixed_now();

    for day in 0..3 {
        engine
            .submit_review(review("u1", "w1", true, start + Duration::days(day)))
            .await
            .unwrap();
    }
    assert_eq!(store.learner("u1").unwrap().unwrap().streak, 3);

    // A gap resets the run: next activity two days later starts over at 1.
    engine
        .submit_review(review("u1", "w1", true, start + Duration::days(5)))
        .await
        .unwrap();
    assert_eq!(store.learner("u1").unwrap().unwrap().streak, 1);
}

#[tokio::test]
async fn learner_summary_rolls_up_profile_numbers() {
    let (engine, _) = setup();
    let now = fixed_now();

    engine.submit_review(review("u1", "w1", true, now)).await.unwrap();
    engine.submit_review(review("u1", "w2", false, now)).await.unwrap();
    engine
        .submit_game(game("u1", GameType::Quiz, 30, vec![], now))
        .await
        .unwrap();

    let summary = engine.learner_summary("u1").await.unwrap();
    assert_eq!(summary.words_learned, 2);
    assert_eq!(summary.wrong_words, 1);
    assert_eq!(summary.games_played, 1);
    assert!((summary.accuracy - 0.5).abs() < f64::EPSILON);
    assert_eq!(summary.exp, 10 + 2 + 30);

    let err = engine.learner_summary("ghost").await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound(_)));
}

#[tokio::test]
async fn leaderboard_keeps_best_score_per_learner() {
    let (engine, store) = setup();
    store
        .put_learner(LearnerAccount::new("u2", "rival", fixed_now()))
        .unwrap();
    let now = fixed_now();

    for (learner, score) in [("u1", 40), ("u1", 90), ("u2", 70), ("u2", 60)] {
        engine
            .submit_game(game(learner, GameType::Sprint, score, vec![], now))
            .await
            .unwrap();
    }

    let rows = engine.leaderboard(GameType::Sprint, 10).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].nickname.as_str(), rows[0].score), ("tester", 90));
    assert_eq!((rows[1].nickname.as_str(), rows[1].score), ("rival", 70));

    let top_one = engine.leaderboard(GameType::Sprint, 1).await.unwrap();
    assert_eq!(top_one.len(), 1);
}

#[tokio::test]
async fn outcomes_serialize_with_camel_case_wire_names() {
    let (engine, _) = setup();

    let outcome = engine
        .submit_review(review("u1", "w1", false, fixed_now()))
        .await
        .unwrap();
    let json = serde_json::to_value(&outcome).unwrap();

    assert_eq!(json["expEarned"], 2);
    assert_eq!(json["leveledUp"], false);
    assert_eq!(json["card"]["intervalDays"], 1);
    assert_eq!(json["wrongEntry"]["category"], "spelling");
    assert_eq!(json["progress"]["status"], "learning");
}

#[tokio::test]
async fn daily_stats_query_returns_newest_first() {
    let (engine, _) = setup();
    let start = fixed_now();

    for day in 0..3 {
        engine
            .submit_review(review("u1", "w1", true, start + Duration::days(day)))
            .await
            .unwrap();
    }

    let stats = engine.daily_stats("u1", 2).await.unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].date, (start + Duration::days(2)).date_naive());
    assert_eq!(stats[1].date, (start + Duration::days(1)).date_naive());
}
