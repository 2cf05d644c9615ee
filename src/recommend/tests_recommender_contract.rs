// =========================================================================
// FALSIFY-RC: cluster-popularity recommender contract
//
// Output never contains an item the target liked, is sorted by popularity
// descending then item id ascending, and holds at most top_n entries.
// =========================================================================

use super::*;
use crate::data::{Book, BookCatalog, RatingRecord};
use crate::preference::PreferenceBuilder;
use crate::primitives::Matrix;

fn scenario() -> (PreferenceMatrix, ClusterAssignment) {
    let ratings = vec![
        RatingRecord::new(1, "A", 10),
        RatingRecord::new(1, "B", 5),
        RatingRecord::new(1, "E", 2),
        RatingRecord::new(2, "A", 9),
        RatingRecord::new(2, "B", 9),
        RatingRecord::new(2, "E", 1),
        RatingRecord::new(3, "C", 9),
        RatingRecord::new(3, "D", 9),
        RatingRecord::new(3, "F", 1),
        RatingRecord::new(4, "C", 8),
        RatingRecord::new(4, "D", 8),
        RatingRecord::new(4, "F", 2),
        RatingRecord::new(5, "A", 9),
        RatingRecord::new(5, "C", 9),
        RatingRecord::new(5, "E", 1),
    ];
    let matrix = PreferenceBuilder::new().build(&ratings).expect("all users like something");
    let centroids = Matrix::from_vec(2, 1, vec![0.0, 1.0]).expect("valid matrix");
    let assignment = ClusterAssignment::from_parts(
        vec![1, 2, 3, 4, 5],
        vec![0, 0, 1, 1, 0],
        2,
        "manual",
        centroids,
        0.0,
    )
    .expect("consistent parts");
    (matrix, assignment)
}

/// FALSIFY-RC-001: liked items are never recommended back
#[test]
fn falsify_rc_001_excludes_liked() {
    let (matrix, assignment) = scenario();
    for user in 1..=5 {
        let recs = Recommender::new(10)
            .recommend(user, &assignment, &matrix)
            .expect("clustered user");
        let liked = matrix.liked_item_ids(user).expect("has likes");
        for rec in &recs {
            assert!(
                !liked.contains(&rec.item_id.as_str()),
                "FALSIFIED RC-001: user {user} was recommended liked item {}",
                rec.item_id
            );
        }
    }
}

/// FALSIFY-RC-002: popularity descending, item id ascending on ties
#[test]
fn falsify_rc_002_ordering() {
    let (matrix, assignment) = scenario();
    let recs = Recommender::new(10)
        .recommend(1, &assignment, &matrix)
        .expect("clustered user");
    assert_eq!(
        recs,
        vec![
            Recommendation { item_id: "B".to_string(), popularity: 1 },
            Recommendation { item_id: "C".to_string(), popularity: 1 },
        ],
        "FALSIFIED RC-002: unexpected ranking"
    );
    for w in recs.windows(2) {
        assert!(
            w[0].popularity > w[1].popularity
                || (w[0].popularity == w[1].popularity && w[0].item_id < w[1].item_id),
            "FALSIFIED RC-002: {:?} before {:?}",
            w[0],
            w[1]
        );
    }
}

/// FALSIFY-RC-003: at most top_n entries
#[test]
fn falsify_rc_003_top_n() {
    let (matrix, assignment) = scenario();
    let recs = Recommender::new(1)
        .recommend(1, &assignment, &matrix)
        .expect("clustered user");
    assert_eq!(recs.len(), 1, "FALSIFIED RC-003: returned {}", recs.len());
    assert_eq!(recs[0].item_id, "B");
}

/// FALSIFY-RC-004: unknown users are NotFound
#[test]
fn falsify_rc_004_unknown_user() {
    let (matrix, assignment) = scenario();
    let result = Recommender::new(10).recommend(99, &assignment, &matrix);
    assert!(
        matches!(result, Err(BookrecError::NotFound { user_id: 99 })),
        "FALSIFIED RC-004: got {result:?}"
    );
}

/// FALSIFY-RC-005: a cluster with nothing new yields an empty list
#[test]
fn falsify_rc_005_nothing_new() {
    let (matrix, assignment) = scenario();
    let recs = Recommender::new(10)
        .recommend(3, &assignment, &matrix)
        .expect("clustered user");
    assert!(recs.is_empty(), "FALSIFIED RC-005: got {recs:?}");
}

#[test]
fn test_cluster_popularity_counts() {
    let (matrix, assignment) = scenario();
    // columns A, B, C, D
    assert_eq!(
        Recommender::cluster_popularity(&assignment, &matrix, 0),
        vec![3, 1, 1, 0]
    );
    assert_eq!(
        Recommender::cluster_popularity(&assignment, &matrix, 1),
        vec![0, 0, 2, 2]
    );
}

#[test]
fn test_recommend_with_details() {
    let (matrix, assignment) = scenario();
    let catalog = BookCatalog::new(vec![Book {
        isbn: "B".to_string(),
        title: "The Book of B".to_string(),
        author: "Bea".to_string(),
        year: 1999,
    }]);
    let books = Recommender::new(10)
        .recommend_with_details(1, &assignment, &matrix, &catalog)
        .expect("clustered user");

    assert_eq!(books.len(), 2);
    assert_eq!(books[0].title.as_deref(), Some("The Book of B"));
    assert_eq!(books[0].year, Some(1999));
    assert_eq!(books[1].item_id, "C");
    assert!(books[1].title.is_none());
}

#[test]
fn test_default_top_n() {
    assert_eq!(Recommender::default().top_n(), 10);
}
