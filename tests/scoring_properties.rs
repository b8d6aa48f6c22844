//! Cross-scorer properties: trending feeding relevance, and the ranking
//! behavior the feed relies on. Pure-formula checks; no database.

use curation_service::config::RankingConfig;
use curation_service::services::relevance::{relevance_score, ViewerAffinity};
use curation_service::services::spotlight::{compute_spotlight_score, SpotlightInputs};
use curation_service::services::trending::{compute_trending_score, TrendingInputs};

fn inputs(
    reactions: i64,
    listens: i64,
    replies: i64,
    remixes: i64,
    completion_rate: f64,
    hours_old: f64,
) -> TrendingInputs {
    TrendingInputs {
        reactions,
        listens,
        replies,
        remixes,
        completion_rate,
        is_sensitive: false,
        moderation_risk: None,
        hours_old,
    }
}

#[test]
fn trending_worked_example_flows_into_anonymous_relevance() {
    let config = RankingConfig::default();

    // 10 reactions, 5 listens, 2 replies, full completion, 1 hour old
    let trending = compute_trending_score(&inputs(10, 5, 2, 0, 1.0, 1.0), &config);
    assert!((trending - 676.0).abs() < 5.0, "expected ~676, got {trending}");

    let anonymous = relevance_score(trending, None, &config);
    assert!((anonymous - 0.4 * (trending / 1000.0)).abs() < 1e-12);
}

#[test]
fn fresh_item_with_no_engagement_scores_zero() {
    let config = RankingConfig::default();
    let trending = compute_trending_score(&inputs(0, 0, 0, 0, 0.5, 0.0), &config);
    assert_eq!(trending, 0.0);
    assert_eq!(relevance_score(trending, None, &config), 0.0);
}

#[test]
fn anonymous_ordering_follows_trending_ordering() {
    let config = RankingConfig::default();

    // Five clips with known counters, all comfortably distinct
    let fixtures = [
        inputs(200, 1000, 40, 10, 0.9, 2.0),
        inputs(50, 300, 10, 2, 0.8, 5.0),
        inputs(10, 50, 3, 0, 0.7, 12.0),
        inputs(2, 10, 0, 0, 0.6, 24.0),
        inputs(0, 1, 0, 0, 0.5, 48.0),
    ];

    let trending: Vec<f64> = fixtures
        .iter()
        .map(|i| compute_trending_score(i, &config))
        .collect();
    let relevance: Vec<f64> = trending
        .iter()
        .map(|t| relevance_score(*t, None, &config))
        .collect();

    for window in trending.windows(2) {
        assert!(window[0] > window[1], "fixtures must rank strictly");
    }
    for window in relevance.windows(2) {
        assert!(
            window[0] >= window[1],
            "anonymous relevance must preserve trending order"
        );
    }
}

#[test]
fn affinity_bonuses_stack_on_top_of_trending_base() {
    let config = RankingConfig::default();
    let trending = compute_trending_score(&inputs(30, 100, 5, 1, 0.85, 4.0), &config);

    let anonymous = relevance_score(trending, None, &config);
    let follower = relevance_score(
        trending,
        Some(&ViewerAffinity {
            follows_topic: true,
            follows_creator: true,
            ..Default::default()
        }),
        &config,
    );

    assert!((follower - anonymous - 0.5).abs() < 1e-9);
}

#[test]
fn decay_orders_otherwise_identical_items() {
    let config = RankingConfig::default();
    let newer = compute_trending_score(&inputs(25, 80, 4, 1, 0.75, 3.0), &config);
    let older = compute_trending_score(&inputs(25, 80, 4, 1, 0.75, 30.0), &config);

    assert!(older < newer);
    assert!(older > 0.0);
}

#[test]
fn spotlight_score_tracks_upvote_mutations_immediately() {
    let base = SpotlightInputs {
        upvotes: 12,
        replies: 3,
        answered: false,
        hours_old: 6.0,
        topic_trending: 120.0,
        last_reply_age_hours: Some(4.0),
    };
    let bumped = SpotlightInputs {
        upvotes: 13,
        ..base
    };

    let before = compute_spotlight_score(&base);
    let after = compute_spotlight_score(&bumped);

    assert!(after > before);
    // Exactly one upvote of weighted, decayed, lifted difference
    let expected_delta =
        5.0 * 1.5 / ((base.hours_old + 1.0).ln() + 1.0);
    assert!((after - before - expected_delta).abs() < 1e-9);
}

#[test]
fn sensitive_and_risky_items_rank_below_clean_twins() {
    let config = RankingConfig::default();
    let clean = inputs(40, 150, 8, 2, 0.9, 6.0);

    let sensitive = TrendingInputs {
        is_sensitive: true,
        ..clean
    };
    let risky = TrendingInputs {
        moderation_risk: Some(0.8),
        ..clean
    };

    let clean_score = compute_trending_score(&clean, &config);
    assert!(compute_trending_score(&sensitive, &config) < clean_score);
    assert!(compute_trending_score(&risky, &config) < clean_score);
}
