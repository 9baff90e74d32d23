use nalgebra::{dmatrix, dvector, DMatrix};
use nalgebra_sparse::CscMatrix;
use pglod::assembly::{
    assemble_basis_correctors, assemble_ms_rhs_matrix, assemble_ms_stiffness_matrix, assemble_stiffness_matrix,
    Operator, OperatorCache,
};
use pglod::coefficient::Coefficient;
use pglod::corrector::{CoarseScaleInformation, CorrectorKind, ElementCorrector, FineScaleInformation};
use pglod::grid::{PatchDescriptor, World};
use std::sync::Arc;
use util::assert_panics;

/// Two coarse elements in 1D, each with a patch covering the whole world.
fn one_dimensional_correctors(world: &World) -> Vec<ElementCorrector> {
    let blocks = [
        (dmatrix![1.0, 2.0; 3.0, 4.0; 5.0, 6.0], dmatrix![0.0, 1.0; 1.0, 2.0; 2.0, 3.0]),
        (dmatrix![10.0, 20.0; 30.0, 40.0; 50.0, 60.0], dmatrix![0.0, 0.0; 0.0, 1.0; 1.0, 1.0]),
    ];
    blocks
        .into_iter()
        .enumerate()
        .map(|(t, (kms_ij, rms_ij))| {
            let csi = CoarseScaleInformation {
                kms_ij: Some(kms_ij),
                rms_ij: Some(rms_ij),
                k_ij: Some(dmatrix![1.0, -1.0; -1.0, 1.0]),
                mu_t_prime: None,
            };
            ElementCorrector::new(CorrectorKind::Basis, t, world.element_patch(t, 1), csi, None)
        })
        .collect()
}

#[test]
fn ms_stiffness_matrix_sums_overlapping_blocks() {
    let world = World::new([2], [1]).unwrap();
    let correctors = one_dimensional_correctors(&world);
    let refs: Vec<_> = correctors.iter().collect();

    let kms = assemble_ms_stiffness_matrix(&world, &refs);
    #[rustfmt::skip]
    let expected = dmatrix![
        1.0, 12.0, 20.0;
        3.0, 34.0, 40.0;
        5.0, 56.0, 60.0
    ];
    assert_eq!(DMatrix::from(&kms), expected);
}

#[test]
fn stiffness_matrix_uses_element_nodes() {
    let world = World::new([2], [1]).unwrap();
    let correctors = one_dimensional_correctors(&world);
    let refs: Vec<_> = correctors.iter().collect();

    let k = assemble_stiffness_matrix(&world, &refs);
    #[rustfmt::skip]
    let expected = dmatrix![
         1.0, -1.0,  0.0;
        -1.0,  2.0, -1.0;
         0.0, -1.0,  1.0
    ];
    assert_eq!(DMatrix::from(&k), expected);
}

#[test]
fn ms_rhs_matrix_from_rhs_blocks() {
    let world = World::new([2], [1]).unwrap();
    let correctors = one_dimensional_correctors(&world);
    let refs: Vec<_> = correctors.iter().collect();

    let rms = assemble_ms_rhs_matrix(&world, &refs);
    #[rustfmt::skip]
    let expected = dmatrix![
        0.0, 1.0, 0.0;
        1.0, 2.0, 1.0;
        2.0, 4.0, 1.0
    ];
    assert_eq!(DMatrix::from(&rms), expected);
}

#[test]
fn basis_correctors_scatter_into_fine_nodes() {
    let world = World::new([2], [2]).unwrap();
    let coefficient = Coefficient::uniform(&world, 1.0);
    let lists = [
        vec![dvector![1.0, 2.0, 3.0], dvector![4.0, 5.0, 6.0]],
        vec![dvector![7.0, 8.0, 9.0], dvector![10.0, 11.0, 12.0]],
    ];
    let correctors: Vec<_> = lists
        .into_iter()
        .enumerate()
        .map(|(t, correctors_list)| {
            let patch = world.element_patch(t, 0);
            let fsi = FineScaleInformation {
                coefficient: coefficient.localize(patch.i_patch_world_coarse(), patch.n_patch_coarse()),
                correctors_list,
            };
            ElementCorrector::new(CorrectorKind::Basis, t, patch, CoarseScaleInformation::default(), Some(fsi))
        })
        .collect();
    let refs: Vec<_> = correctors.iter().collect();

    let basis = assemble_basis_correctors(&world, &refs);
    assert_eq!((basis.nrows(), basis.ncols()), (5, 3));
    #[rustfmt::skip]
    let expected = dmatrix![
        1.0,  4.0,  0.0;
        2.0,  5.0,  0.0;
        3.0, 13.0, 10.0;
        0.0,  8.0, 11.0;
        0.0,  9.0, 12.0
    ];
    assert_eq!(DMatrix::from(&basis), expected);
}

#[test]
fn assembly_panics_on_missing_data() {
    let world = World::new([2], [1]).unwrap();
    let correctors = one_dimensional_correctors(&world);
    let refs: Vec<_> = correctors.iter().collect();

    // Basis correctors need fine quantities
    assert_panics!(assemble_basis_correctors(&world, &refs));
    // One corrector per coarse element
    assert_panics!(assemble_ms_stiffness_matrix(&world, &refs[..1]));

    let without_blocks = ElementCorrector::new(
        CorrectorKind::Rhs,
        1,
        PatchDescriptor::new(vec![0], vec![2]),
        CoarseScaleInformation::default(),
        None,
    );
    assert_panics!(assemble_ms_rhs_matrix(&world, &[refs[0], &without_blocks]));
}

#[test]
fn operator_cache_stores_and_invalidates() {
    let mut cache = OperatorCache::default();
    assert!(cache.is_empty());

    let stored = cache.insert(Operator::Stiffness, CscMatrix::identity(3));
    assert!(Arc::ptr_eq(&stored, cache.get(Operator::Stiffness).unwrap()));
    assert!(cache.get(Operator::MsStiffness).is_none());
    assert!(!cache.is_empty());

    cache.invalidate();
    assert!(cache.is_empty());
    assert!(cache.get(Operator::Stiffness).is_none());
}
