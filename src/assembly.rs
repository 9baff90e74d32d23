//! Assembly of global sparse operators from element correctors.
//!
//! Every routine follows the same pattern: for each coarse element, the local dense block of its
//! corrector is scattered into a list of triplets using two index maps, one for the rows (nodes of
//! the patch or of the element) and one for the columns (the coarse nodes of the element itself).
//! Duplicate triplets are summed when the triplets are converted to compressed column form.
use crate::corrector::{CoarseScaleInformation, ElementCorrector};
use crate::grid::World;
use log::debug;
use nalgebra::DMatrix;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use std::sync::Arc;

/// The global operators assembled from element correctors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Multiscale stiffness matrix `Kms`.
    MsStiffness,
    /// Stiffness matrix `K` of the unperturbed coefficient.
    Stiffness,
    /// Right-hand-side transfer matrix `Rms`.
    MsRhs,
    /// Fine-by-coarse matrix of basis corrections.
    BasisCorrectors,
}

/// Lazily populated storage of assembled operators.
#[derive(Debug, Clone, Default)]
pub struct OperatorCache {
    kms: Option<Arc<CscMatrix<f64>>>,
    k: Option<Arc<CscMatrix<f64>>>,
    rms: Option<Arc<CscMatrix<f64>>>,
    basis_correctors: Option<Arc<CscMatrix<f64>>>,
}

impl OperatorCache {
    fn slot_mut(&mut self, operator: Operator) -> &mut Option<Arc<CscMatrix<f64>>> {
        match operator {
            Operator::MsStiffness => &mut self.kms,
            Operator::Stiffness => &mut self.k,
            Operator::MsRhs => &mut self.rms,
            Operator::BasisCorrectors => &mut self.basis_correctors,
        }
    }

    pub fn get(&self, operator: Operator) -> Option<&Arc<CscMatrix<f64>>> {
        match operator {
            Operator::MsStiffness => self.kms.as_ref(),
            Operator::Stiffness => self.k.as_ref(),
            Operator::MsRhs => self.rms.as_ref(),
            Operator::BasisCorrectors => self.basis_correctors.as_ref(),
        }
    }

    /// Stores a freshly assembled operator, replacing any cached one.
    pub fn insert(&mut self, operator: Operator, matrix: CscMatrix<f64>) -> Arc<CscMatrix<f64>> {
        let matrix = Arc::new(matrix);
        *self.slot_mut(operator) = Some(Arc::clone(&matrix));
        matrix
    }

    pub fn invalidate(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.kms.is_none() && self.k.is_none() && self.rms.is_none() && self.basis_correctors.is_none()
    }
}

fn scatter_block(coo: &mut CooMatrix<f64>, rows: &[usize], cols: &[usize], block: &DMatrix<f64>) {
    assert_eq!(
        block.shape(),
        (rows.len(), cols.len()),
        "Local block shape does not match its index maps"
    );
    for (c, &col) in cols.iter().enumerate() {
        for (r, &row) in rows.iter().enumerate() {
            coo.push(row, col, block[(r, c)]);
        }
    }
}

fn local_block<'a>(
    corrector: &'a ElementCorrector,
    name: &str,
    select: impl Fn(&CoarseScaleInformation) -> Option<&DMatrix<f64>>,
) -> &'a DMatrix<f64> {
    select(corrector.csi()).unwrap_or_else(|| {
        panic!(
            "Corrector of coarse element {} does not provide the local block {}",
            corrector.element_index(),
            name
        )
    })
}

fn assert_one_corrector_per_element(world: &World, correctors: &[&ElementCorrector]) {
    assert_eq!(
        correctors.len(),
        world.num_coarse_elements(),
        "Assembly requires exactly one corrector per coarse element"
    );
}

/// Scatters blocks with rows on the coarse nodes of the patch and columns on the element's nodes.
fn assemble_patch_by_element(
    world: &World,
    correctors: &[&ElementCorrector],
    name: &str,
    select: impl Fn(&CoarseScaleInformation) -> Option<&DMatrix<f64>>,
) -> CscMatrix<f64> {
    assert_one_corrector_per_element(world, correctors);
    let np_coarse = world.num_coarse_nodes();
    let mut coo = CooMatrix::new(np_coarse, np_coarse);
    for (element_index, corrector) in correctors.iter().enumerate() {
        let rows = world.coarse_patch_nodes(corrector.patch());
        let cols = world.coarse_element_nodes(element_index);
        scatter_block(&mut coo, &rows, &cols, local_block(corrector, name, &select));
    }
    let matrix = CscMatrix::from(&coo);
    debug!("Assembled {} with {} non-zeros", name, matrix.nnz());
    matrix
}

/// Assembles the multiscale stiffness matrix `Kms` from the `kms_ij` blocks.
///
/// # Panics
///
/// Panics if there is not exactly one corrector per coarse element or a corrector lacks `kms_ij`.
pub fn assemble_ms_stiffness_matrix(world: &World, correctors: &[&ElementCorrector]) -> CscMatrix<f64> {
    assemble_patch_by_element(world, correctors, "Kms", |csi| csi.kms_ij.as_ref())
}

/// Assembles the right-hand-side transfer matrix `Rms` from the `rms_ij` blocks of the
/// right-hand-side correctors.
///
/// # Panics
///
/// Panics if there is not exactly one corrector per coarse element or a corrector lacks `rms_ij`.
pub fn assemble_ms_rhs_matrix(world: &World, rhs_correctors: &[&ElementCorrector]) -> CscMatrix<f64> {
    assemble_patch_by_element(world, rhs_correctors, "Rms", |csi| csi.rms_ij.as_ref())
}

/// Assembles the stiffness matrix `K` of the unperturbed coefficient from the `k_ij` blocks.
///
/// # Panics
///
/// Panics if there is not exactly one corrector per coarse element or a corrector lacks `k_ij`.
pub fn assemble_stiffness_matrix(world: &World, correctors: &[&ElementCorrector]) -> CscMatrix<f64> {
    assert_one_corrector_per_element(world, correctors);
    let np_coarse = world.num_coarse_nodes();
    let mut coo = CooMatrix::new(np_coarse, np_coarse);
    for (element_index, corrector) in correctors.iter().enumerate() {
        let nodes = world.coarse_element_nodes(element_index);
        scatter_block(&mut coo, &nodes, &nodes, local_block(corrector, "K", |csi| csi.k_ij.as_ref()));
    }
    let matrix = CscMatrix::from(&coo);
    debug!("Assembled K with {} non-zeros", matrix.nnz());
    matrix
}

/// Assembles the matrix mapping coarse nodal values to their fine-scale basis corrections.
///
/// Column `j` holds the correction of coarse basis function `j` on the fine nodes.
///
/// # Panics
///
/// Panics if there is not exactly one corrector per coarse element, or if any corrector has
/// discarded its fine quantities.
pub fn assemble_basis_correctors(world: &World, correctors: &[&ElementCorrector]) -> CscMatrix<f64> {
    assert_one_corrector_per_element(world, correctors);
    let mut coo = CooMatrix::new(world.num_fine_nodes(), world.num_coarse_nodes());
    for (element_index, corrector) in correctors.iter().enumerate() {
        let fsi = corrector.fsi().unwrap_or_else(|| {
            panic!(
                "Corrector of coarse element {} has no fine quantities to assemble basis correctors from",
                element_index
            )
        });
        let rows = world.fine_patch_nodes(corrector.patch());
        let cols = world.coarse_element_nodes(element_index);
        assert_eq!(
            fsi.correctors_list.len(),
            cols.len(),
            "Expected one basis corrector per coarse node of element {}",
            element_index
        );
        for (corrector_values, &col) in fsi.correctors_list.iter().zip(&cols) {
            assert_eq!(corrector_values.len(), rows.len(), "Basis corrector does not match the patch");
            for (&row, &value) in rows.iter().zip(corrector_values.iter()) {
                coo.push(row, col, value);
            }
        }
    }
    let matrix = CscMatrix::from(&coo);
    debug!("Assembled basis correctors with {} non-zeros", matrix.nnz());
    matrix
}
