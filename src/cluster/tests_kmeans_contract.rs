// =========================================================================
// FALSIFY-KM: k-means contract
//
// Labels index real centroids, every point sits with its nearest centroid,
// restarts never worsen the objective, and a fixed seed reproduces the fit.
//
// References:
//   - Lloyd (1982) "Least Squares Quantization in PCM"
//   - Arthur & Vassilvitskii (2007) "k-means++: The Advantages of Careful Seeding"
// =========================================================================

use super::*;

fn two_blobs() -> Matrix<f32> {
    Matrix::from_vec(
        6,
        2,
        vec![1.0, 2.0, 1.5, 1.8, 1.0, 0.6, 8.0, 8.0, 9.0, 11.0, 8.5, 9.0],
    )
    .expect("valid matrix")
}

fn four_blobs() -> Matrix<f32> {
    Matrix::from_vec(
        12,
        2,
        vec![
            0.0, 0.0, 0.2, 0.1, 0.1, 0.3, //
            5.0, 0.0, 5.2, 0.1, 5.1, 0.2, //
            0.0, 5.0, 0.1, 5.3, 0.2, 5.1, //
            5.0, 5.0, 5.1, 5.2, 5.3, 5.1,
        ],
    )
    .expect("valid matrix")
}

/// FALSIFY-KM-001: Valid cluster indices: all labels in [0, K-1]
#[test]
fn falsify_km_001_valid_indices() {
    let data = two_blobs();
    let k = 2;
    let mut km = KMeans::new(k).with_random_state(42);
    km.fit(&data).expect("fit succeeds");

    for (i, &label) in km.predict(&data).iter().enumerate() {
        assert!(
            label < k,
            "FALSIFIED KM-001: label[{i}] = {label}, expected < {k}"
        );
    }
}

/// FALSIFY-KM-002: Objective non-negative and equal to the recomputed sum
#[test]
fn falsify_km_002_inertia_matches_labels() {
    let data = four_blobs();
    let mut km = KMeans::new(4).with_random_state(1);
    km.fit(&data).expect("fit succeeds");

    let recomputed = inertia(&data, km.centroids(), km.labels());
    assert!(km.inertia() >= 0.0, "FALSIFIED KM-002: inertia < 0");
    assert!(
        (km.inertia() - recomputed).abs() < 1e-4,
        "FALSIFIED KM-002: inertia {} != recomputed {recomputed}",
        km.inertia()
    );
}

/// FALSIFY-KM-003: Nearest centroid assignment: each point assigned to closest
#[test]
fn falsify_km_003_nearest_centroid() {
    let data = four_blobs();
    let mut km = KMeans::new(3).with_random_state(7);
    km.fit(&data).expect("fit succeeds");

    let centroids = km.centroids();
    for (i, &assigned) in km.labels().iter().enumerate() {
        let d_assigned = squared_euclidean(data.row(i), centroids.row(assigned));
        for c in 0..3 {
            let d_other = squared_euclidean(data.row(i), centroids.row(c));
            assert!(
                d_assigned <= d_other + 1e-5,
                "FALSIFIED KM-003: point[{i}] assigned to c={assigned} (d={d_assigned}) but c={c} is closer (d={d_other})"
            );
        }
    }
}

/// FALSIFY-KM-004: K=1: all points in same cluster, centroid is mean
#[test]
fn falsify_km_004_single_cluster() {
    let data = Matrix::from_vec(3, 2, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).expect("valid matrix");

    let mut km = KMeans::new(1).with_random_state(42);
    km.fit(&data).expect("fit succeeds");

    for (i, &l) in km.predict(&data).iter().enumerate() {
        assert_eq!(l, 0, "FALSIFIED KM-004: point[{i}] not in cluster 0");
    }
    let centroids = km.centroids();
    assert!(
        (centroids.get(0, 0) - 3.0).abs() < 1e-4,
        "FALSIFIED KM-004: centroid[0][0] = {}, expected 3.0",
        centroids.get(0, 0)
    );
    assert!(
        (centroids.get(0, 1) - 4.0).abs() < 1e-4,
        "FALSIFIED KM-004: centroid[0][1] = {}, expected 4.0",
        centroids.get(0, 1)
    );
}

/// FALSIFY-KM-005: more restarts never increase inertia for the same seed
#[test]
fn falsify_km_005_restarts_monotone() {
    let data = four_blobs();
    let mut one = KMeans::new(4).with_random_state(11).with_n_init(1);
    let mut many = KMeans::new(4).with_random_state(11).with_n_init(10);
    one.fit(&data).expect("fit succeeds");
    many.fit(&data).expect("fit succeeds");

    assert!(
        many.inertia() <= one.inertia(),
        "FALSIFIED KM-005: n_init=10 inertia {} > n_init=1 inertia {}",
        many.inertia(),
        one.inertia()
    );
}

/// FALSIFY-KM-006: fixed seed gives identical labels and inertia
#[test]
fn falsify_km_006_reproducible() {
    let data = four_blobs();
    let mut a = KMeans::new(3).with_random_state(5);
    let mut b = KMeans::new(3).with_random_state(5);
    a.fit(&data).expect("fit a");
    b.fit(&data).expect("fit b");

    assert_eq!(a.labels(), b.labels(), "FALSIFIED KM-006: labels differ");
    assert_eq!(
        a.inertia().to_bits(),
        b.inertia().to_bits(),
        "FALSIFIED KM-006: inertia differs"
    );
}

/// FALSIFY-KM-007: well separated blobs are recovered exactly
#[test]
fn falsify_km_007_recovers_blobs() {
    let data = four_blobs();
    let mut km = KMeans::new(4).with_random_state(0);
    km.fit(&data).expect("fit succeeds");

    let labels = km.labels();
    for blob in 0..4 {
        let base = blob * 3;
        assert_eq!(labels[base], labels[base + 1], "FALSIFIED KM-007");
        assert_eq!(labels[base], labels[base + 2], "FALSIFIED KM-007");
    }
    let mut firsts: Vec<usize> = (0..4).map(|b| labels[b * 3]).collect();
    firsts.sort_unstable();
    firsts.dedup();
    assert_eq!(firsts.len(), 4, "FALSIFIED KM-007: blobs merged");
}

/// FALSIFY-KM-008: centroids are the means of the returned labels, even when
/// the iteration cap stops Lloyd early
#[test]
fn falsify_km_008_centroids_match_labels_at_cap() {
    let data = Matrix::from_vec(
        10,
        1,
        vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 20.0, 21.0],
    )
    .expect("valid matrix");
    for seed in 0..10 {
        let mut km = KMeans::new(3).with_random_state(seed).with_max_iter(1).with_n_init(1);
        km.fit(&data).expect("fit succeeds");

        for c in 0..3 {
            let members: Vec<f32> = km
                .labels()
                .iter()
                .enumerate()
                .filter(|&(_, &l)| l == c)
                .map(|(i, _)| data.get(i, 0))
                .collect();
            assert!(!members.is_empty());
            let mean = members.iter().sum::<f32>() / members.len() as f32;
            let centroid = km.centroids().get(c, 0);
            assert!(
                (centroid - mean).abs() < 1e-5,
                "FALSIFIED KM-008: seed {seed}, centroid {centroid} != member mean {mean}"
            );
        }
    }
}

#[test]
fn test_empty_cluster_reseeded() {
    let data = two_blobs();
    let km = KMeans::new(2);
    let old = vec![vec![1.0, 1.0], vec![100.0, 100.0]];
    let mut labels = vec![0; 6];

    let updated = km.update_centroids(&data, &mut labels, &old);
    assert!(labels.contains(&1), "empty cluster kept no member");
    // the farthest point from (1, 1) is (9, 11)
    assert_eq!(labels[4], 1);
    assert_eq!(updated[1], vec![9.0, 11.0]);
}

#[test]
fn test_assign_ties_go_to_lower_index() {
    let data = Matrix::from_vec(1, 1, vec![0.0]).expect("valid matrix");
    let centroids = vec![vec![-1.0], vec![1.0]];
    assert_eq!(KMeans::assign_labels(&data, &centroids), vec![0]);
}

#[test]
fn test_new() {
    let kmeans = KMeans::new(3);
    assert_eq!(kmeans.n_clusters(), 3);
    assert!(!kmeans.is_fitted());
}

#[test]
fn test_builders() {
    let kmeans = KMeans::new(3)
        .with_max_iter(10)
        .with_tol(1e-6)
        .with_n_init(4)
        .with_random_state(42);
    assert_eq!(kmeans.max_iter, 10);
    assert!((kmeans.tol - 1e-6).abs() < 1e-10);
    assert_eq!(kmeans.n_init, 4);
    assert_eq!(kmeans.random_state, Some(42));
}

#[test]
fn test_empty_data_error() {
    let data = Matrix::from_vec(0, 2, vec![]).expect("valid matrix");
    let mut kmeans = KMeans::new(2);
    assert!(kmeans.fit(&data).is_err());
}

#[test]
fn test_too_many_clusters_error() {
    let data = Matrix::from_vec(3, 2, vec![1.0; 6]).expect("valid matrix");
    let mut kmeans = KMeans::new(5);
    assert!(matches!(
        kmeans.fit(&data),
        Err(BookrecError::Clustering(_))
    ));
}

#[test]
fn test_zero_restarts_error() {
    let mut kmeans = KMeans::new(2).with_n_init(0);
    assert!(kmeans.fit(&two_blobs()).is_err());
}

#[test]
fn test_identical_points() {
    let data = Matrix::from_vec(4, 2, vec![2.0; 8]).expect("valid matrix");
    let mut kmeans = KMeans::new(2).with_random_state(3);
    kmeans.fit(&data).expect("fit succeeds");
    assert!(kmeans.inertia().abs() < 1e-6);
}

#[test]
#[should_panic(expected = "Model not fitted")]
fn test_predict_before_fit() {
    let kmeans = KMeans::new(2);
    let _ = kmeans.predict(&two_blobs());
}
