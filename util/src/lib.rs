use eyre::{bail, eyre};
use nalgebra::{DMatrix, DVector, DVectorView};
use pglod::coefficient::Coefficient;
use pglod::corrector::{CoarseScaleInformation, CorrectorKind, ElementCorrector, FineScaleInformation, WorkItem};
use pglod::dispatch::{CorrectorContext, PatchComputation};
use pglod::grid::{convert_p_coordinate_to_index, convert_p_index_to_coordinate, num_elements, num_points, World};
use pglod::indicator::IndicatorInput;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Poor man's approx assertion for matrices
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = $x - $y;

        let max_absdiff = diff.abs().max();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {}", $x);
            println!("right: {}", $y);
            println!("diff: {:e}", diff);
        }
        assert!(approx_eq);
    }};
}

/// Asserts that evaluating the expression panics, without requiring it to be unwind safe.
#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::{catch_unwind, AssertUnwindSafe};
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(AssertUnwindSafe(|| $e));
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Relative contrast `|a - b| / sqrt(a b)`, maximized over all entries.
fn max_relative_contrast(a: &DVector<f64>, b: &DVector<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| (a - b).abs() / (a * b).sqrt())
        .fold(0.0, f64::max)
}

/// A deterministic stand-in for a real patch solver.
///
/// Local blocks are scaled by the mean of the coefficient over the patch, so that correctors
/// change exactly when the coefficient on their patch changes. The error indicator is the largest
/// relative contrast between the old and new coefficient on the patch.
#[derive(Debug, Default)]
pub struct MockPatchComputation {
    failing_elements: Vec<usize>,
    fail_after: Option<usize>,
    num_computed: AtomicUsize,
    num_indicator_evaluations: AtomicUsize,
}

impl MockPatchComputation {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mock that fails to compute the correctors of the given elements.
    pub fn failing_on(failing_elements: impl Into<Vec<usize>>) -> Self {
        Self {
            failing_elements: failing_elements.into(),
            ..Self::default()
        }
    }

    /// A mock that fails every corrector computation after the first `num_successful`.
    pub fn failing_after(num_successful: usize) -> Self {
        Self {
            fail_after: Some(num_successful),
            ..Self::default()
        }
    }

    pub fn num_computed(&self) -> usize {
        self.num_computed.load(Ordering::SeqCst)
    }

    pub fn num_indicator_evaluations(&self) -> usize {
        self.num_indicator_evaluations.load(Ordering::SeqCst)
    }
}

impl PatchComputation for MockPatchComputation {
    fn compute_element_corrector(
        &self,
        context: &CorrectorContext,
        item: &WorkItem,
    ) -> eyre::Result<ElementCorrector> {
        if self.failing_elements.contains(&item.element_index) {
            bail!("Saddle point solver did not converge");
        }
        if self.fail_after.map_or(false, |n| self.num_computed() >= n) {
            bail!("Worker unavailable");
        }
        self.num_computed.fetch_add(1, Ordering::SeqCst);

        let world = context.world;
        let patch = world.element_patch(item.element_index, context.k);
        let coefficient_patch = context
            .coefficient
            .localize(patch.i_patch_world_coarse(), patch.n_patch_coarse());
        let a_mean = coefficient_patch.a_fine().mean();

        let np_patch_coarse = num_points(patch.n_patch_coarse());
        let ne = world.num_element_coarse_nodes();
        let mut csi = CoarseScaleInformation {
            mu_t_prime: Some(DVector::from_element(num_elements(patch.n_patch_coarse()), 1.0)),
            ..CoarseScaleInformation::default()
        };
        match context.kind {
            CorrectorKind::Basis => {
                csi.kms_ij = Some(DMatrix::from_fn(np_patch_coarse, ne, |r, c| {
                    a_mean * (1.0 + r as f64 + 0.1 * c as f64)
                }));
                csi.k_ij = Some(DMatrix::from_fn(ne, ne, |r, c| {
                    if r == c {
                        a_mean * (ne - 1) as f64
                    } else {
                        -a_mean
                    }
                }));
            }
            CorrectorKind::Rhs => {
                csi.rms_ij = Some(DMatrix::from_fn(np_patch_coarse, ne, |r, c| a_mean * (r + c) as f64));
            }
        }

        let fsi = if context.clear_fine_quantities {
            None
        } else {
            let np_patch_fine = num_points(&coefficient_patch.n_patch_fine());
            let correctors_list = (0..ne)
                .map(|c| DVector::from_fn(np_patch_fine, |r, _| a_mean * (c + 1) as f64 / (r + 1) as f64))
                .collect();
            Some(FineScaleInformation {
                coefficient: coefficient_patch,
                correctors_list,
            })
        };

        Ok(ElementCorrector::new(context.kind, item.element_index, patch, csi, fsi))
    }

    fn error_indicator(&self, corrector: &ElementCorrector, input: &IndicatorInput) -> eyre::Result<f64> {
        self.num_indicator_evaluations.fetch_add(1, Ordering::SeqCst);
        match input {
            IndicatorInput::Coarse { delta, .. } => Ok(delta.iter().copied().fold(0.0, f64::max)),
            IndicatorInput::Lagging { a_patch, a_lagging } => Ok(max_relative_contrast(a_patch, a_lagging)),
            IndicatorInput::Fine { coefficient_patch } => {
                let fsi = corrector
                    .fsi()
                    .ok_or_else(|| eyre!("Corrector has no fine quantities"))?;
                Ok(max_relative_contrast(&fsi.coefficient.a_fine(), &coefficient_patch.a_fine()))
            }
        }
    }

    fn compute_element_correction(
        &self,
        _world: &World,
        _corrector: &ElementCorrector,
        coefficient_patch: &Coefficient,
        a_rhs: Option<DVectorView<f64>>,
        m_rhs: Option<DVectorView<f64>>,
    ) -> eyre::Result<DVector<f64>> {
        let a_mean = coefficient_patch.a_fine().mean();
        let rhs_sum = a_rhs.map(|rhs| rhs.sum()).unwrap_or(0.0) + m_rhs.map(|rhs| rhs.sum()).unwrap_or(0.0);
        let np_patch_fine = num_points(&coefficient_patch.n_patch_fine());
        Ok(DVector::from_element(np_patch_fine, a_mean * rhs_sum))
    }
}

/// A square two-dimensional world.
pub fn square_world(num_coarse_per_dim: usize, num_fine_per_coarse: usize) -> World {
    World::new([num_coarse_per_dim; 2], [num_fine_per_coarse; 2]).expect("Valid world")
}

/// The coarse element containing each fine element of the world.
pub fn coarse_element_of_fine_elements(world: &World) -> Vec<usize> {
    let fine_shape: Vec<_> = world.n_world_fine().iter().map(|n| n - 1).collect();
    let coarse_shape: Vec<_> = world.n_world_coarse().iter().map(|n| n - 1).collect();
    (0..world.num_fine_elements())
        .map(|fine_index| {
            let coordinate: Vec<_> = convert_p_index_to_coordinate(&fine_shape, fine_index)
                .iter()
                .zip(world.n_coarse_element())
                .map(|(c, m)| c / m)
                .collect();
            convert_p_coordinate_to_index(&coarse_shape, &coordinate)
        })
        .collect()
}

/// Fine values equal to `base`, except inside the given coarse elements where they are `value`.
pub fn perturbed_values(world: &World, base: f64, elements: &[usize], value: f64) -> DVector<f64> {
    let coarse_of_fine = coarse_element_of_fine_elements(world);
    DVector::from_iterator(
        coarse_of_fine.len(),
        coarse_of_fine
            .iter()
            .map(|t| if elements.contains(t) { value } else { base }),
    )
}

/// A fine-scale coefficient equal to `base` except inside the given coarse elements.
pub fn perturbed_coefficient(world: &World, base: f64, elements: &[usize], value: f64) -> Coefficient {
    Coefficient::fine_scale(world, perturbed_values(world, base, elements, value)).expect("Valid coefficient")
}
