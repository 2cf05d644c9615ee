// =========================================================================
// FALSIFY-PCA: sparse PCA contract
//
// Components are unit eigenvectors of the sample covariance, ordered by
// decreasing variance, sign-fixed, and reproducible for a fixed seed.
//
// References:
//   - Hotelling (1933) "Analysis of a complex of statistical variables"
//   - Saad (2011) "Numerical Methods for Large Eigenvalue Problems", ch. 5
// =========================================================================

use super::*;

fn binary_data() -> Matrix<f32> {
    Matrix::from_vec(
        6,
        4,
        vec![
            1.0, 1.0, 0.0, 0.0, //
            1.0, 1.0, 1.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 1.0, //
            0.0, 0.0, 1.0, 1.0, //
            1.0, 0.0, 0.0, 1.0,
        ],
    )
    .expect("valid matrix")
}

fn dense_covariance(x: &Matrix<f32>) -> Vec<Vec<f64>> {
    let (n, p) = x.shape();
    let mean: Vec<f64> = (0..p)
        .map(|j| x.column(j).iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64)
        .collect();
    let mut cov = vec![vec![0.0; p]; p];
    for row in x.rows() {
        for a in 0..p {
            for b in 0..p {
                cov[a][b] += (f64::from(row[a]) - mean[a]) * (f64::from(row[b]) - mean[b]);
            }
        }
    }
    for row in &mut cov {
        for v in row.iter_mut() {
            *v /= (n - 1) as f64;
        }
    }
    cov
}

/// FALSIFY-PCA-001: output has n_components columns and one row per sample
#[test]
fn falsify_pca_001_dimensionality_reduction() {
    let data = binary_data();
    for n_components in 1..=4 {
        let mut pca = Pca::new(n_components);
        let transformed = pca.fit_transform(&data).expect("fit succeeds");
        assert_eq!(
            transformed.shape(),
            (6, n_components),
            "FALSIFIED PCA-001: wrong output shape for d={n_components}"
        );
    }
}

/// FALSIFY-PCA-002: variance ratios lie in [0, 1] and sum to at most 1
#[test]
fn falsify_pca_002_explained_variance_bounded() {
    let mut pca = Pca::new(3);
    Transformer::<Matrix<f32>>::fit(&mut pca, &binary_data()).expect("fit succeeds");
    let ratios = pca.explained_variance_ratio().expect("fitted");

    for (i, &r) in ratios.iter().enumerate() {
        assert!(
            (0.0..=1.0 + 1e-9).contains(&r),
            "FALSIFIED PCA-002: ratio[{i}] = {r} outside [0, 1]"
        );
    }
    let total: f64 = ratios.iter().sum();
    assert!(total <= 1.0 + 1e-9, "FALSIFIED PCA-002: ratios sum to {total}");
}

/// FALSIFY-PCA-003: components are sorted by explained variance
#[test]
fn falsify_pca_003_variance_ordering() {
    let mut pca = Pca::new(4);
    Transformer::<Matrix<f32>>::fit(&mut pca, &binary_data()).expect("fit succeeds");
    let variance = pca.explained_variance().expect("fitted");
    for w in variance.windows(2) {
        assert!(
            w[0] >= w[1] - 1e-12,
            "FALSIFIED PCA-003: variance not descending: {variance:?}"
        );
    }
}

/// FALSIFY-PCA-004: same data and seed produce the same transform
#[test]
fn falsify_pca_004_deterministic() {
    let data = binary_data();
    let a = Pca::new(2).with_random_state(3).fit_transform(&data).expect("fit a");
    let b = Pca::new(2).with_random_state(3).fit_transform(&data).expect("fit b");
    assert_eq!(a, b, "FALSIFIED PCA-004: repeated fit differs");
}

/// FALSIFY-PCA-004b: transform on a fitted model is a pure function
#[test]
fn falsify_pca_004b_transform_idempotent() {
    let data = binary_data();
    let mut pca = Pca::new(2).with_random_state(3);
    Transformer::<Matrix<f32>>::fit(&mut pca, &data).expect("fit succeeds");
    let first = pca.transform(&data).expect("first transform");
    let second = pca.transform(&data).expect("second transform");
    assert_eq!(first, second, "FALSIFIED PCA-004b: transform changed between calls");

    let sparse = CsrMatrix::from_dense(&data);
    assert_eq!(
        pca.transform(&sparse).expect("sparse transform"),
        pca.transform(&sparse).expect("sparse transform again"),
    );
}

/// FALSIFY-PCA-005: each component is a unit eigenvector of the covariance
#[test]
fn falsify_pca_005_eigen_equation() {
    let data = binary_data();
    let cov = dense_covariance(&data);
    let mut pca = Pca::new(3);
    Transformer::<Matrix<f32>>::fit(&mut pca, &data).expect("fit succeeds");

    let components = pca.components().expect("fitted");
    let variance = pca.explained_variance().expect("fitted");
    for c in 0..3 {
        let v = components.row(c);
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-9, "FALSIFIED PCA-005: |v{c}| = {norm}");

        for (a, cov_row) in cov.iter().enumerate() {
            let cv: f64 = cov_row.iter().zip(v).map(|(x, y)| x * y).sum();
            assert!(
                (cv - variance[c] * v[a]).abs() < 1e-8,
                "FALSIFIED PCA-005: (Cv)[{a}] = {cv} != λ v[{a}] for component {c}"
            );
        }
    }
}

/// FALSIFY-PCA-006: the largest-magnitude loading of each component is positive
#[test]
fn falsify_pca_006_sign_convention() {
    for seed in [0_u64, 1, 99] {
        let mut pca = Pca::new(2).with_random_state(seed);
        Transformer::<Matrix<f32>>::fit(&mut pca, &binary_data()).expect("fit succeeds");
        let components = pca.components().expect("fitted");
        for c in 0..2 {
            let pivot = components
                .row(c)
                .iter()
                .copied()
                .fold(0.0_f64, |acc, w| if w.abs() > acc.abs() { w } else { acc });
            assert!(pivot > 0.0, "FALSIFIED PCA-006: component {c} pivot {pivot}");
        }
    }
}

/// FALSIFY-PCA-007: infeasible dimensions are rejected
#[test]
fn falsify_pca_007_dimensionality_error() {
    let data = binary_data();
    for requested in [0, 5] {
        let result = Pca::new(requested).fit_transform(&data);
        assert!(
            matches!(
                result,
                Err(BookrecError::Dimensionality { max: 4, .. })
            ),
            "FALSIFIED PCA-007: d={requested} accepted"
        );
    }
}

#[test]
fn test_sparse_and_dense_paths_agree() {
    let dense = binary_data();
    let sparse = CsrMatrix::from_dense(&dense);

    let from_dense = Pca::new(2).fit_transform(&dense).expect("dense fit");
    let from_sparse = Pca::new(2).fit_transform(&sparse).expect("sparse fit");
    assert_eq!(from_dense, from_sparse);
}

#[test]
fn test_projection_is_centered() {
    let transformed = Pca::new(2).fit_transform(&binary_data()).expect("fit");
    for c in 0..2 {
        let mean: f32 = transformed.column(c).iter().sum::<f32>() / 6.0;
        assert!(mean.abs() < 1e-5, "component {c} mean {mean}");
    }
}

#[test]
fn test_full_rank_reconstruction() {
    let data = binary_data();
    let mut pca = Pca::new(4);
    let transformed = pca.fit_transform(&data).expect("fit");
    let restored = pca.inverse_transform(&transformed).expect("inverse");
    for (a, b) in data.as_slice().iter().zip(restored.as_slice()) {
        assert!((a - b).abs() < 1e-4, "{a} vs {b}");
    }
}

#[test]
fn test_rank_deficient_input() {
    // every row lies on one line, so only one direction carries variance
    let data = Matrix::from_vec(
        4,
        3,
        vec![1.0, 1.0, 0.0, 2.0, 2.0, 0.0, 3.0, 3.0, 0.0, 4.0, 4.0, 0.0],
    )
    .expect("valid matrix");
    let mut pca = Pca::new(3);
    let transformed = pca.fit_transform(&data).expect("fit");
    assert_eq!(transformed.shape(), (4, 3));

    let variance = pca.explained_variance().expect("fitted");
    assert!(variance[0] > 1.0);
    assert!(variance[1].abs() < 1e-9);
    assert!(variance[2].abs() < 1e-9);
    let ratio = pca.explained_variance_ratio().expect("fitted");
    assert!((ratio[0] - 1.0).abs() < 1e-9);
}

#[test]
fn test_transform_before_fit() {
    let pca = Pca::new(2);
    assert!(pca.transform(&binary_data()).is_err());
    assert!(!pca.is_fitted());
}

#[test]
fn test_transform_width_mismatch() {
    let mut pca = Pca::new(1);
    Transformer::<Matrix<f32>>::fit(&mut pca, &binary_data()).expect("fit");
    let narrow = Matrix::from_vec(1, 3, vec![1.0, 0.0, 0.0]).expect("valid matrix");
    assert!(matches!(
        pca.transform(&narrow),
        Err(BookrecError::Configuration(_))
    ));
}

#[test]
fn test_rayleigh_ritz_sorts_descending() {
    let q = DMatrix::<f64>::identity(3, 3);
    let z = DMatrix::from_row_slice(3, 3, &[1.0, 0.0, 0.0, 0.0, 4.0, 0.0, 0.0, 0.0, 2.0]);
    let (values, rotation) = rayleigh_ritz(&q, &z);
    assert!((values[0] - 4.0).abs() < 1e-12);
    assert!((values[1] - 2.0).abs() < 1e-12);
    assert!((values[2] - 1.0).abs() < 1e-12);
    assert!((rotation[(1, 0)].abs() - 1.0).abs() < 1e-12);
    assert!((rotation[(2, 1)].abs() - 1.0).abs() < 1e-12);
}

#[test]
fn test_orthonormal_basis_of_dependent_columns() {
    let block = DMatrix::from_column_slice(3, 2, &[1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
    let q = orthonormal_basis(block);
    let gram = q.transpose() * &q;
    assert!((gram - DMatrix::<f64>::identity(2, 2)).abs().max() < 1e-12);
}
