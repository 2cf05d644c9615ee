// =========================================================================
// FALSIFY-KS: cluster-count selection contract
//
// The survey is reproducible for a fixed seed, infeasible k values are
// skipped, and the winner is the highest silhouette (smaller k on ties).
//
// References:
//   - Rousseeuw (1987) "Silhouettes"
//   - Thorndike (1953) "Who belongs in the family?" (elbow method)
// =========================================================================

use super::*;
use crate::cluster::HierarchicalStrategy;
use crate::primitives::Matrix;

fn three_groups() -> Embedding {
    let vectors = Matrix::from_vec(
        9,
        2,
        vec![
            0.0, 0.0, 0.2, 0.1, 0.1, 0.3, //
            6.0, 0.0, 6.1, 0.2, 5.9, 0.1, //
            3.0, 6.0, 3.2, 6.1, 2.9, 5.8,
        ],
    )
    .expect("valid matrix");
    Embedding::new((100..109).collect(), vectors).expect("one row per user")
}

/// FALSIFY-KS-001: the same seed yields identical inertia and silhouettes
#[test]
fn falsify_ks_001_deterministic() {
    let embedding = three_groups();
    let selector = ClusterCountSelector::new(42);
    let a = selector.select(&embedding, &[2, 3, 4, 5], &[2, 3, 4]).expect("run a");
    let b = selector.select(&embedding, &[2, 3, 4, 5], &[2, 3, 4]).expect("run b");

    for (x, y) in a.elbow.iter().zip(&b.elbow) {
        assert_eq!(
            x.inertia.to_bits(),
            y.inertia.to_bits(),
            "FALSIFIED KS-001: inertia differs at k={}",
            x.k
        );
    }
    for (x, y) in a.silhouettes.iter().zip(&b.silhouettes) {
        assert_eq!(
            x.score.to_bits(),
            y.score.to_bits(),
            "FALSIFIED KS-001: silhouette differs at k={}",
            x.k
        );
    }
    assert_eq!(a, b);
}

/// FALSIFY-KS-002: the natural group count wins
#[test]
fn falsify_ks_002_best_k_is_natural() {
    let report = ClusterCountSelector::new(0)
        .select(&three_groups(), &[2, 3, 4, 5, 6], &[2, 3, 4, 5])
        .expect("valid shortlist");
    assert_eq!(report.best_k, 3, "FALSIFIED KS-002: picked k={}", report.best_k);
    assert!(report.best_score().expect("scored") > 0.8);
}

/// FALSIFY-KS-003: elbow inertia does not increase with k on separated data
#[test]
fn falsify_ks_003_elbow_decreasing() {
    let elbow = ClusterCountSelector::new(0)
        .elbow(&three_groups(), &[2, 3, 4])
        .expect("valid candidates");
    assert_eq!(elbow.len(), 3);
    for w in elbow.windows(2) {
        assert!(
            w[1].inertia <= w[0].inertia + 1e-5,
            "FALSIFIED KS-003: inertia rose from k={} to k={}",
            w[0].k,
            w[1].k
        );
    }
}

/// FALSIFY-KS-004: infeasible candidates are skipped, not fatal
#[test]
fn falsify_ks_004_infeasible_skipped() {
    let report = ClusterCountSelector::new(0)
        .select(&three_groups(), &[0, 1, 2, 3, 9, 25], &[1, 3, 9])
        .expect("k=3 survives");
    let elbow_ks: Vec<usize> = report.elbow.iter().map(|p| p.k).collect();
    let survey_ks: Vec<usize> = report.silhouettes.iter().map(|p| p.k).collect();
    assert_eq!(elbow_ks, vec![2, 3], "FALSIFIED KS-004: elbow kept {elbow_ks:?}");
    assert_eq!(survey_ks, vec![3], "FALSIFIED KS-004: survey kept {survey_ks:?}");
}

/// FALSIFY-KS-005: an all-infeasible shortlist is a clustering error
#[test]
fn falsify_ks_005_empty_shortlist_errors() {
    let result = ClusterCountSelector::new(0).select(&three_groups(), &[2], &[1, 9, 40]);
    assert!(
        matches!(result, Err(BookrecError::Clustering(_))),
        "FALSIFIED KS-005: accepted an infeasible shortlist"
    );
}

/// FALSIFY-KS-006: ties go to the smaller k
#[test]
fn falsify_ks_006_tie_prefers_smaller_k() {
    let points = [
        SilhouettePoint { k: 5, score: 0.4 },
        SilhouettePoint { k: 3, score: 0.4 },
        SilhouettePoint { k: 4, score: 0.2 },
    ];
    assert_eq!(best_k(&points), Some(3), "FALSIFIED KS-006");
    assert_eq!(best_k(&[]), None);
}

#[test]
fn test_survey_with_hierarchical_strategy() {
    let selector = ClusterCountSelector::new(0);
    let survey = selector
        .silhouette_survey(&three_groups(), &[2, 3, 4], &HierarchicalStrategy::new())
        .expect("valid shortlist");
    assert_eq!(survey.len(), 3);
    assert_eq!(best_k(&survey), Some(3));
}

#[test]
fn test_select_with_strategy() {
    let report = ClusterCountSelector::new(0)
        .select_with(&three_groups(), &[2, 3], &[2, 3], &HierarchicalStrategy::new())
        .expect("valid shortlist");
    assert_eq!(report.best_k, 3);
    assert_eq!(report.elbow.len(), 2);
}
