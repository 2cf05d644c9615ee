// =========================================================================
// FALSIFY-HC: agglomerative (hierarchical) clustering contract
//
// The dendrogram has n-1 merges sorted by height, node ids follow the
// leaves-then-merges convention, and cutting at k yields exactly k labels.
//
// References:
//   - Ward (1963) "Hierarchical grouping to optimize an objective function"
//   - Müllner (2011) "Modern hierarchical, agglomerative clustering algorithms"
// =========================================================================

use super::*;

fn two_groups() -> Matrix<f32> {
    Matrix::from_vec(
        6,
        2,
        vec![
            0.0, 0.0, 0.1, 0.1, 0.2, 0.0, 10.0, 10.0, 10.1, 10.1, 10.0, 10.2,
        ],
    )
    .expect("valid matrix")
}

fn line() -> Matrix<f32> {
    Matrix::from_vec(4, 1, vec![0.0, 1.0, 3.0, 7.0]).expect("valid matrix")
}

/// Closest-pair search over the full matrix, O(n³).
fn naive_heights(x: &Matrix<f32>, linkage: Linkage) -> Vec<f64> {
    let n = x.n_rows();
    let mut dist = vec![vec![0.0_f64; n]; n];
    for i in 0..n {
        for j in 0..n {
            dist[i][j] = f64::from(euclidean(x.row(i), x.row(j)));
        }
    }
    let mut active = vec![true; n];
    let mut size = vec![1.0_f64; n];
    let mut heights = Vec::new();
    for _ in 0..(n - 1) {
        let mut best = (0, 0, f64::INFINITY);
        for i in 0..n {
            for j in (i + 1)..n {
                if active[i] && active[j] && dist[i][j] < best.2 {
                    best = (i, j, dist[i][j]);
                }
            }
        }
        let (a, b, h) = best;
        for k in 0..n {
            if active[k] && k != a && k != b {
                let v = lance_williams(linkage, dist[a][k], dist[b][k], h, size[a], size[b], size[k]);
                dist[b][k] = v;
                dist[k][b] = v;
            }
        }
        active[a] = false;
        size[b] += size[a];
        heights.push(h);
    }
    heights.sort_by(f64::total_cmp);
    heights
}

/// FALSIFY-HC-001: Labels length matches sample count
#[test]
fn falsify_hc_001_labels_length() {
    let mut hc = AgglomerativeClustering::new(2, Linkage::Average);
    hc.fit(&two_groups()).expect("fit succeeds");
    assert_eq!(
        hc.labels().len(),
        6,
        "FALSIFIED HC-001: labels len={}, expected 6",
        hc.labels().len()
    );
}

/// FALSIFY-HC-002: Number of distinct labels equals n_clusters
#[test]
fn falsify_hc_002_n_clusters_correct() {
    let mut hc = AgglomerativeClustering::new(2, Linkage::Ward);
    hc.fit(&two_groups()).expect("fit succeeds");

    for k in 1..=6 {
        let labels = hc.cut(k).expect("valid k");
        let mut unique = labels.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(
            unique,
            (0..k).collect::<Vec<_>>(),
            "FALSIFIED HC-002: cut({k}) gave labels {labels:?}"
        );
    }
}

/// FALSIFY-HC-003: Two well-separated clusters get distinct labels
#[test]
fn falsify_hc_003_distinct_clusters() {
    for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average, Linkage::Ward] {
        let mut hc = AgglomerativeClustering::new(2, linkage);
        hc.fit(&two_groups()).expect("fit succeeds");
        assert_eq!(
            hc.labels(),
            &[0, 0, 0, 1, 1, 1],
            "FALSIFIED HC-003: {linkage:?} split the groups"
        );
    }
}

/// FALSIFY-HC-004: dendrogram has n-1 merges in non-decreasing height
#[test]
fn falsify_hc_004_dendrogram_monotone() {
    let mut hc = AgglomerativeClustering::new(2, Linkage::Ward);
    hc.fit(&two_groups()).expect("fit succeeds");
    let merges = hc.dendrogram();

    assert_eq!(merges.len(), 5, "FALSIFIED HC-004: wrong merge count");
    for w in merges.windows(2) {
        assert!(
            w[0].distance <= w[1].distance,
            "FALSIFIED HC-004: heights {} > {}",
            w[0].distance,
            w[1].distance
        );
    }
    assert_eq!(merges[4].size, 6, "FALSIFIED HC-004: root does not hold every leaf");
}

/// FALSIFY-HC-005: Ward heights on a line match the closed form
#[test]
fn falsify_hc_005_ward_heights() {
    let mut hc = AgglomerativeClustering::new(1, Linkage::Ward);
    hc.fit(&line()).expect("fit succeeds");
    let merges = hc.dendrogram();

    let expected = [
        Merge { left: 0, right: 1, distance: 1.0, size: 2 },
        Merge { left: 2, right: 4, distance: (25.0_f64 / 3.0).sqrt(), size: 3 },
        Merge { left: 3, right: 5, distance: (1.5_f64).sqrt() * (17.0 / 3.0), size: 4 },
    ];
    for (got, want) in merges.iter().zip(&expected) {
        assert_eq!((got.left, got.right, got.size), (want.left, want.right, want.size));
        assert!(
            (got.distance - want.distance).abs() < 1e-6,
            "FALSIFIED HC-005: height {} != {}",
            got.distance,
            want.distance
        );
    }
}

/// FALSIFY-HC-006: chain heights equal closest-pair heights for every linkage
#[test]
fn falsify_hc_006_chain_matches_naive() {
    let data = Matrix::from_vec(
        8,
        2,
        vec![
            0.0, 0.0, 0.3, 1.1, 2.0, 0.4, 2.7, 2.9, 5.1, 0.2, 5.5, 1.7, 8.3, 3.1, 9.0, 0.6,
        ],
    )
    .expect("valid matrix");

    for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average, Linkage::Ward] {
        let got: Vec<f64> = linkage_tree(&data, linkage).iter().map(|m| m.distance).collect();
        let want = naive_heights(&data, linkage);
        for (g, w) in got.iter().zip(&want) {
            assert!(
                (g - w).abs() < 1e-9,
                "FALSIFIED HC-006: {linkage:?} height {g} != {w}"
            );
        }
    }
}

/// FALSIFY-HC-007: input above the sample ceiling fails fast
#[test]
fn falsify_hc_007_sample_ceiling() {
    let mut hc = AgglomerativeClustering::new(2, Linkage::Ward).with_max_samples(5);
    let result = hc.fit(&two_groups());
    assert!(
        matches!(result, Err(BookrecError::Clustering(_))),
        "FALSIFIED HC-007: oversized input accepted"
    );
    assert!(!hc.is_fitted());
}

#[test]
fn test_single_linkage_heights() {
    let merges = linkage_tree(&line(), Linkage::Single);
    let heights: Vec<f64> = merges.iter().map(|m| m.distance).collect();
    assert_eq!(heights, vec![1.0, 2.0, 4.0]);
}

#[test]
fn test_centroids_are_cluster_means() {
    let mut hc = AgglomerativeClustering::new(2, Linkage::Ward);
    hc.fit(&line()).expect("fit succeeds");
    // {0, 1, 3} and {7}
    assert_eq!(hc.labels(), &[0, 0, 0, 1]);
    let centroids = hc.centroids();
    assert!((centroids.get(0, 0) - 4.0 / 3.0).abs() < 1e-6);
    assert!((centroids.get(1, 0) - 7.0).abs() < 1e-6);
}

#[test]
fn test_predict_nearest_mean() {
    let mut hc = AgglomerativeClustering::new(2, Linkage::Average);
    hc.fit(&two_groups()).expect("fit succeeds");
    let new_points = Matrix::from_vec(2, 2, vec![9.0, 9.0, 1.0, 0.0]).expect("valid matrix");
    assert_eq!(hc.predict(&new_points), vec![1, 0]);
}

#[test]
fn test_invalid_k() {
    let mut hc = AgglomerativeClustering::new(7, Linkage::Ward);
    assert!(hc.fit(&two_groups()).is_err());

    let mut hc = AgglomerativeClustering::new(2, Linkage::Ward);
    hc.fit(&two_groups()).expect("fit succeeds");
    assert!(hc.cut(0).is_err());
    assert!(hc.cut(7).is_err());
}

#[test]
fn test_cut_before_fit() {
    let hc = AgglomerativeClustering::new(2, Linkage::Ward);
    assert!(hc.cut(2).is_err());
}

#[test]
#[should_panic(expected = "Model not fitted")]
fn test_labels_before_fit() {
    let hc = AgglomerativeClustering::new(2, Linkage::Average);
    let _ = hc.labels();
}

#[test]
#[should_panic(expected = "Model not fitted")]
fn test_dendrogram_before_fit() {
    let hc = AgglomerativeClustering::new(2, Linkage::Average);
    let _ = hc.dendrogram();
}

#[test]
fn test_condensed_index() {
    // n = 4: (0,1)=0 (0,2)=1 (0,3)=2 (1,2)=3 (1,3)=4 (2,3)=5
    assert_eq!(condensed_index(4, 0, 1), 0);
    assert_eq!(condensed_index(4, 1, 2), 3);
    assert_eq!(condensed_index(4, 2, 3), 5);
}
