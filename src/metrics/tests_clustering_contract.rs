// =========================================================================
// FALSIFY-CM: clustering metrics contract
//
// Silhouette values lie in [-1, 1], singleton clusters score 0, and the
// score is the mean of the per-point values. Inertia is a sum of squares.
//
// References:
//   - Rousseeuw (1987) "Silhouettes: a graphical aid to the interpretation
//     and validation of cluster analysis"
// =========================================================================

use super::*;

fn separated() -> Matrix<f32> {
    Matrix::from_vec(
        6,
        2,
        vec![0.0, 0.0, 0.1, 0.1, 0.2, 0.0, 5.0, 5.0, 5.1, 5.1, 5.0, 5.2],
    )
    .expect("valid matrix")
}

/// FALSIFY-CM-001: silhouette values are bounded by [-1, 1]
#[test]
fn falsify_cm_001_silhouette_bounded() {
    let data = separated();
    for labels in [
        vec![0, 0, 0, 1, 1, 1],
        vec![0, 1, 0, 1, 0, 1],
        vec![0, 0, 1, 1, 2, 2],
    ] {
        for (i, s) in silhouette_samples(&data, &labels).iter().enumerate() {
            assert!(
                (-1.0..=1.0).contains(s),
                "FALSIFIED CM-001: s[{i}] = {s} for labels {labels:?}"
            );
        }
    }
}

/// FALSIFY-CM-002: good partitions outscore scrambled ones
#[test]
fn falsify_cm_002_separation_rewarded() {
    let data = separated();
    let good = silhouette_score(&data, &[0, 0, 0, 1, 1, 1]);
    let bad = silhouette_score(&data, &[0, 1, 0, 1, 0, 1]);
    assert!(good > 0.9, "FALSIFIED CM-002: good partition scored {good}");
    assert!(bad < 0.0, "FALSIFIED CM-002: scrambled partition scored {bad}");
}

/// FALSIFY-CM-003: singleton-cluster points score exactly 0
#[test]
fn falsify_cm_003_singleton_zero() {
    let data = separated();
    let samples = silhouette_samples(&data, &[0, 0, 0, 1, 1, 2]);
    assert_eq!(samples[5], 0.0, "FALSIFIED CM-003: singleton scored {}", samples[5]);
    assert!(samples[0] > 0.0);
}

/// FALSIFY-CM-004: degenerate inputs score 0
#[test]
fn falsify_cm_004_degenerate_inputs() {
    let data = separated();
    assert_eq!(silhouette_score(&data, &[0; 6]), 0.0, "FALSIFIED CM-004: one cluster");
    // unused label ids do not count as clusters
    assert_eq!(
        silhouette_score(&data, &[0, 0, 0, 2, 2, 2]),
        silhouette_score(&data, &[0, 0, 0, 1, 1, 1]),
        "FALSIFIED CM-004: empty cluster changed the score"
    );
    assert_eq!(silhouette_score(&data, &[3; 6]), 0.0, "FALSIFIED CM-004: one populated cluster");

    let single = Matrix::from_vec(1, 2, vec![1.0, 1.0]).expect("valid matrix");
    assert_eq!(silhouette_score(&single, &[0]), 0.0, "FALSIFIED CM-004: one point");

    let empty = Matrix::from_vec(0, 2, vec![]).expect("valid matrix");
    assert_eq!(silhouette_score(&empty, &[]), 0.0, "FALSIFIED CM-004: no points");
}

/// FALSIFY-CM-005: score is the mean of the samples
#[test]
fn falsify_cm_005_score_is_mean() {
    let data = separated();
    let labels = [0, 0, 1, 1, 2, 2];
    let samples = silhouette_samples(&data, &labels);
    let mean = samples.iter().sum::<f32>() / samples.len() as f32;
    let score = silhouette_score(&data, &labels);
    assert!((score - mean).abs() < 1e-6, "FALSIFIED CM-005: {score} != {mean}");
}

/// FALSIFY-CM-006: inertia is zero iff every point sits on its centroid
#[test]
fn falsify_cm_006_inertia() {
    let data = Matrix::from_vec(3, 1, vec![1.0, 1.0, 4.0]).expect("valid matrix");
    let centroids = Matrix::from_vec(2, 1, vec![1.0, 4.0]).expect("valid matrix");
    assert_eq!(inertia(&data, &centroids, &[0, 0, 1]), 0.0);

    let one = Matrix::from_vec(1, 1, vec![2.0]).expect("valid matrix");
    assert!((inertia(&data, &one, &[0, 0, 0]) - 6.0).abs() < 1e-6);
}

#[test]
fn test_hand_computed_silhouette() {
    // points 0, 1 | 4 on a line
    let data = Matrix::from_vec(3, 1, vec![0.0, 1.0, 4.0]).expect("valid matrix");
    let samples = silhouette_samples(&data, &[0, 0, 1]);
    // a=1, b=4 -> 0.75 ; a=1, b=3 -> 2/3 ; singleton -> 0
    assert!((samples[0] - 0.75).abs() < 1e-6);
    assert!((samples[1] - 2.0 / 3.0).abs() < 1e-6);
    assert_eq!(samples[2], 0.0);
}

#[test]
fn test_silhouette_coefficient_zero_distances() {
    assert_eq!(silhouette_coefficient(0.0, 0.0), 0.0);
    assert!((silhouette_coefficient(1.0, 2.0) - 0.5).abs() < 1e-12);
}
