// =========================================================================
// FALSIFY-PM: implicit preference matrix contract
//
// A book is liked iff rating > that reader's own mean rating (strict).
// Rows exist only for readers with at least one like.
// =========================================================================

use super::*;

fn record(user: u64, item: &str, rating: i32) -> RatingRecord {
    RatingRecord::new(user, item, rating)
}

fn sample_records() -> Vec<RatingRecord> {
    vec![
        record(10, "0451", 8),
        record(10, "0452", 4),
        record(10, "0453", 6),
        record(20, "0452", 9),
        record(20, "0454", 1),
        record(30, "0451", 7),
        record(30, "0451", 7),
        record(30, "0455", 1),
        record(40, "0453", 5),
    ]
}

/// FALSIFY-PM-001: mean rating is the arithmetic mean of the user's own ratings
#[test]
fn falsify_pm_001_mean_matches_raw_subset() {
    let records = sample_records();
    let profiles = user_profiles(&records);

    for (user, profile) in &profiles {
        let own: Vec<f64> = records
            .iter()
            .filter(|r| r.user_id == *user)
            .map(|r| f64::from(r.rating))
            .collect();
        let expected = own.iter().sum::<f64>() / own.len() as f64;
        assert!(
            (profile.mean_rating - expected).abs() < 1e-12,
            "FALSIFIED PM-001: user {user} mean {} != {expected}",
            profile.mean_rating
        );
        assert_eq!(profile.n_ratings, own.len());
    }
}

/// FALSIFY-PM-002: a rating equal to the mean is never liked
#[test]
fn falsify_pm_002_ties_not_liked() {
    let records = vec![record(1, "A", 7), record(1, "B", 7), record(2, "A", 9), record(2, "C", 1)];
    let matrix = PreferenceBuilder::new().build(&records).expect("user 2 likes A");

    assert!(
        matrix.row_of(1).is_none(),
        "FALSIFIED PM-002: user with two equal ratings has a row"
    );
    assert_eq!(matrix.users(), &[2]);
}

/// FALSIFY-PM-003: every present row has at least one liked item
#[test]
fn falsify_pm_003_row_sums_positive() {
    let matrix = PreferenceBuilder::new()
        .build(&sample_records())
        .expect("non-empty");
    for (row, sum) in matrix.row_sums().iter().enumerate() {
        assert!(*sum >= 1, "FALSIFIED PM-003: row {row} has no likes");
    }
}

/// FALSIFY-PM-004: single-rating users are dropped but keep a profile
#[test]
fn falsify_pm_004_single_rating_dropped() {
    let matrix = PreferenceBuilder::new()
        .build(&sample_records())
        .expect("non-empty");
    assert!(matrix.row_of(40).is_none());
    let profile = matrix.profile(40).expect("profile kept");
    assert!((profile.mean_rating - 5.0).abs() < 1e-12);
}

#[test]
fn test_liked_cells() {
    let matrix = PreferenceBuilder::new()
        .build(&sample_records())
        .expect("non-empty");

    // user 10: mean 6 -> likes 0451 only (0453 == mean)
    assert_eq!(matrix.liked_item_ids(10), Some(vec!["0451"]));
    // user 20: mean 5 -> likes 0452
    assert_eq!(matrix.liked_item_ids(20), Some(vec!["0452"]));
    // user 30: mean 5 -> duplicate 0451 collapses to one cell
    assert_eq!(matrix.liked_item_ids(30), Some(vec!["0451"]));

    assert_eq!(matrix.users(), &[10, 20, 30]);
    assert_eq!(matrix.items(), &["0451".to_string(), "0452".to_string()]);
    assert_eq!(matrix.csr().nnz(), 3);
}

#[test]
fn test_dense_view() {
    let matrix = PreferenceBuilder::new()
        .build(&sample_records())
        .expect("non-empty");
    let dense = matrix.to_dense();
    assert_eq!(dense.shape(), (3, 2));
    assert_eq!(dense.row(0), &[1.0, 0.0]);
    assert_eq!(dense.row(1), &[0.0, 1.0]);
    assert_eq!(dense.row(2), &[1.0, 0.0]);
}

#[test]
fn test_empty_records_error() {
    let result = PreferenceBuilder::new().build(&[]);
    assert!(matches!(result, Err(BookrecError::Configuration(_))));
}

#[test]
fn test_nothing_liked_error() {
    let records = vec![record(1, "A", 5), record(2, "B", 3), record(3, "C", 4), record(3, "D", 4)];
    let result = PreferenceBuilder::new().build(&records);
    assert!(matches!(result, Err(BookrecError::Configuration(_))));
}

#[test]
fn test_profile_likes_boundary() {
    let profile = UserProfile {
        user_id: 1,
        mean_rating: 6.0,
        n_ratings: 3,
    };
    assert!(profile.likes(7));
    assert!(!profile.likes(6));
    assert!(!profile.likes(0));
}

#[test]
fn test_unknown_user() {
    let matrix = PreferenceBuilder::new()
        .build(&sample_records())
        .expect("non-empty");
    assert!(matrix.liked_items(999).is_none());
    assert!(matrix.profile(999).is_none());
}
