//! Element correctors: the per-element products of the patch computation.
use crate::coefficient::Coefficient;
use crate::grid::PatchDescriptor;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

pub mod arena;

/// Which local problem a corrector solves.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CorrectorKind {
    /// Correctors of the coarse basis functions, giving `Kms` and `K`.
    Basis,
    /// Right-hand-side correctors, giving `Rms`.
    Rhs,
}

/// A request to compute the corrector of one coarse element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkItem {
    pub element_index: usize,
    pub element_coordinate: Vec<usize>,
}

/// Coarse summary quantities of an element corrector.
///
/// Local blocks have rows indexed by the coarse nodes of the patch (or of the element for `k_ij`)
/// and columns indexed by the `2^d` coarse nodes of the element itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoarseScaleInformation {
    /// Local multiscale stiffness block.
    pub kms_ij: Option<DMatrix<f64>>,
    /// Local right-hand-side transfer block.
    pub rms_ij: Option<DMatrix<f64>>,
    /// Local stiffness block of the unperturbed coefficient.
    pub k_ij: Option<DMatrix<f64>>,
    /// Per coarse element of the patch, the weight used by coarse error indicators.
    pub mu_t_prime: Option<DVector<f64>>,
}

/// Fine-scale data that a corrector may retain.
#[derive(Debug, Clone, PartialEq)]
pub struct FineScaleInformation {
    /// The coefficient restricted to the patch the corrector was computed with.
    pub coefficient: Coefficient,
    /// One fine nodal vector over the patch per coarse node of the element.
    pub correctors_list: Vec<DVector<f64>>,
}

/// The corrector of a single coarse element.
///
/// Correctors are immutable once computed. Invalidation replaces them wholesale.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementCorrector {
    kind: CorrectorKind,
    element_index: usize,
    patch: PatchDescriptor,
    csi: CoarseScaleInformation,
    fsi: Option<FineScaleInformation>,
}

impl ElementCorrector {
    pub fn new(
        kind: CorrectorKind,
        element_index: usize,
        patch: PatchDescriptor,
        csi: CoarseScaleInformation,
        fsi: Option<FineScaleInformation>,
    ) -> Self {
        Self {
            kind,
            element_index,
            patch,
            csi,
            fsi,
        }
    }

    pub fn kind(&self) -> CorrectorKind {
        self.kind
    }

    pub fn element_index(&self) -> usize {
        self.element_index
    }

    pub fn patch(&self) -> &PatchDescriptor {
        &self.patch
    }

    pub fn i_patch_world_coarse(&self) -> &[usize] {
        self.patch.i_patch_world_coarse()
    }

    pub fn n_patch_coarse(&self) -> &[usize] {
        self.patch.n_patch_coarse()
    }

    pub fn csi(&self) -> &CoarseScaleInformation {
        &self.csi
    }

    pub fn fsi(&self) -> Option<&FineScaleInformation> {
        self.fsi.as_ref()
    }

    pub fn has_fine_quantities(&self) -> bool {
        self.fsi.is_some()
    }

    /// Discards the fine-scale data, keeping only the coarse summary.
    pub fn clear_fine_quantities(self) -> Self {
        Self { fsi: None, ..self }
    }
}
