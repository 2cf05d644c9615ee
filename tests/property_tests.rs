//! Property-based tests using proptest.
//!
//! These tests check invariants that must hold for any input, not just the
//! hand-built fixtures in the unit tests.

use bookrec::metrics::{silhouette_samples, silhouette_score};
use bookrec::model_selection::{best_k, SilhouettePoint};
use bookrec::prelude::*;
use proptest::prelude::*;

fn matrix_strategy(rows: usize, cols: usize) -> impl Strategy<Value = Matrix<f32>> {
    proptest::collection::vec(-10.0f32..10.0, rows * cols).prop_map(move |data| {
        Matrix::from_vec(rows, cols, data).expect("Test data should be valid")
    })
}

fn ratings_strategy() -> impl Strategy<Value = Vec<RatingRecord>> {
    proptest::collection::vec((0u64..8, 0usize..6, 0i32..=10), 10..60).prop_map(|rows| {
        rows.into_iter()
            .map(|(user, item, rating)| {
                RatingRecord::new(user, ["A", "B", "C", "D", "E", "F"][item], rating)
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn liked_means_strictly_above_user_mean(ratings in ratings_strategy()) {
        let Ok(matrix) = PreferenceBuilder::new().build(&ratings) else {
            return Ok(());
        };
        for &user in matrix.users() {
            let profile = matrix.profile(user).expect("every row has a profile");
            let liked = matrix.liked_item_ids(user).expect("row exists");
            prop_assert!(!liked.is_empty());
            for item in liked {
                let best = ratings
                    .iter()
                    .filter(|r| r.user_id == user && r.item_id == item)
                    .map(|r| r.rating)
                    .max()
                    .expect("liked item was rated");
                prop_assert!(f64::from(best) > profile.mean_rating);
            }
        }
    }

    #[test]
    fn recommendations_are_new_sorted_and_bounded(
        ratings in ratings_strategy(),
        top_n in 1usize..5,
    ) {
        let Ok(matrix) = PreferenceBuilder::new().build(&ratings) else {
            return Ok(());
        };
        let users = matrix.users().to_vec();
        let labels: Vec<usize> = users.iter().map(|u| (u % 2) as usize).collect();
        let centroids = Matrix::from_vec(2, 1, vec![0.0, 1.0]).expect("2x1");
        let assignment =
            ClusterAssignment::from_parts(users.clone(), labels, 2, "parity", centroids, 0.0)
                .expect("consistent parts");

        let recommender = Recommender::new(top_n);
        for &user in &users {
            let recs = recommender
                .recommend(user, &assignment, &matrix)
                .expect("clustered user");
            let liked = matrix.liked_item_ids(user).expect("row exists");

            prop_assert!(recs.len() <= top_n);
            for rec in &recs {
                prop_assert!(!liked.contains(&rec.item_id.as_str()));
                prop_assert!(rec.popularity > 0);
            }
            for w in recs.windows(2) {
                prop_assert!(
                    w[0].popularity > w[1].popularity
                        || (w[0].popularity == w[1].popularity && w[0].item_id < w[1].item_id)
                );
            }
        }
    }

    #[test]
    fn pca_components_are_orthonormal(x in matrix_strategy(8, 5)) {
        let mut pca = Pca::new(3).with_random_state(1);
        pca.fit(&x).expect("3 <= min(8, 5)");
        let components = pca.components().expect("fitted");

        for i in 0..3 {
            for j in 0..3 {
                let dot: f64 = components
                    .row(i)
                    .iter()
                    .zip(components.row(j))
                    .map(|(a, b)| a * b)
                    .sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                prop_assert!((dot - expected).abs() < 1e-6, "<c{}, c{}> = {}", i, j, dot);
            }
        }
    }

    #[test]
    fn pca_variance_ratio_is_bounded_and_ordered(x in matrix_strategy(8, 5)) {
        let mut pca = Pca::new(3);
        pca.fit(&x).expect("3 <= min(8, 5)");
        let ratio = pca.explained_variance_ratio().expect("fitted");

        prop_assert!(ratio.iter().all(|&r| (0.0..=1.0 + 1e-9).contains(&r)));
        prop_assert!(ratio.iter().sum::<f64>() <= 1.0 + 1e-9);
        for w in ratio.windows(2) {
            prop_assert!(w[0] + 1e-9 >= w[1]);
        }
    }

    #[test]
    fn kmeans_labels_in_range(x in matrix_strategy(12, 2), k in 2usize..6, seed in 0u64..100) {
        let mut kmeans = KMeans::new(k).with_random_state(seed);
        kmeans.fit(&x).expect("k < 12");

        prop_assert_eq!(kmeans.labels().len(), 12);
        prop_assert!(kmeans.labels().iter().all(|&l| l < k));
        prop_assert!(kmeans.inertia() >= 0.0);
        prop_assert_eq!(kmeans.predict(&x).len(), 12);
    }

    #[test]
    fn silhouette_is_bounded(x in matrix_strategy(10, 2), k in 2usize..5) {
        let labels: Vec<usize> = (0..10).map(|i| i % k).collect();
        let score = silhouette_score(&x, &labels);
        prop_assert!((-1.0..=1.0).contains(&score));
        for s in silhouette_samples(&x, &labels) {
            prop_assert!((-1.0 - 1e-6..=1.0 + 1e-6).contains(&s));
        }
    }

    #[test]
    fn agglomerative_cut_has_k_clusters(x in matrix_strategy(10, 2), k in 2usize..6) {
        let mut model = AgglomerativeClustering::new(k, Linkage::Ward);
        model.fit(&x).expect("k < 10");

        let mut seen = model.labels().to_vec();
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen, (0..k).collect::<Vec<_>>());
        prop_assert_eq!(model.dendrogram().len(), 9);
    }

    #[test]
    fn best_k_prefers_highest_then_smallest(scores in proptest::collection::vec(-1.0f32..1.0, 1..8)) {
        let points: Vec<SilhouettePoint> = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| SilhouettePoint { k: i + 2, score })
            .collect();
        let chosen = best_k(&points).expect("non-empty");
        let top = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let first_top = points.iter().find(|p| p.score == top).expect("max exists");
        prop_assert_eq!(chosen, first_top.k);
    }
}
