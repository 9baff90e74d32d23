//! Error indicators deciding whether an element corrector is still valid.
use crate::coefficient::{coarse_grained_contrast, Coefficient, CoefficientField};
use crate::corrector::ElementCorrector;
use crate::dispatch::PatchComputation;
use eyre::{bail, ensure};
use nalgebra::DVector;

/// The data an error indicator is evaluated on, determined by the kind of the new coefficient.
///
/// All fields are restricted to the patch of the corrector being examined.
#[derive(Debug, Clone, PartialEq)]
pub enum IndicatorInput {
    /// Elementwise contrast between the origin coefficient and a coarse-grained coefficient.
    Coarse {
        delta: DVector<f64>,
        kappa: DVector<f64>,
    },
    /// Current values and their lagging reference copy.
    Lagging {
        a_patch: DVector<f64>,
        a_lagging: DVector<f64>,
    },
    /// The new coefficient, to be compared against the fine data retained by the corrector.
    Fine { coefficient_patch: Coefficient },
}

impl IndicatorInput {
    /// Builds the indicator input for the given corrector.
    ///
    /// `coefficient` and `origin_coefficient` are defined on the whole world.
    pub fn for_corrector(
        origin_coefficient: &Coefficient,
        coefficient: &Coefficient,
        corrector: &ElementCorrector,
    ) -> eyre::Result<Self> {
        let origin = corrector.i_patch_world_coarse();
        let size = corrector.n_patch_coarse();
        let coefficient_patch = coefficient.localize(origin, size);
        match coefficient_patch.field() {
            CoefficientField::CoarseGrained { .. } => {
                let a_old = origin_coefficient.localize(origin, size).a_fine();
                let a_new = coefficient_patch.a_fine();
                let (delta, kappa) = coarse_grained_contrast(&a_old, &a_new);
                Ok(Self::Coarse { delta, kappa })
            }
            CoefficientField::Lagging { a_fine, a_lagging } => Ok(Self::Lagging {
                a_patch: a_fine.clone(),
                a_lagging: a_lagging.clone(),
            }),
            CoefficientField::FineScale { .. } | CoefficientField::Uniform(_) => {
                if !corrector.has_fine_quantities() {
                    bail!(
                        "Fine-scale error indicator for coarse element {} requires fine quantities, \
                         but the corrector has discarded them",
                        corrector.element_index()
                    );
                }
                Ok(Self::Fine { coefficient_patch })
            }
        }
    }
}

/// Evaluates the error indicator of a corrector under a new coefficient.
pub fn measure_error_indicator<P>(
    computation: &P,
    origin_coefficient: &Coefficient,
    coefficient: &Coefficient,
    corrector: &ElementCorrector,
) -> eyre::Result<f64>
where
    P: PatchComputation + ?Sized,
{
    let input = IndicatorInput::for_corrector(origin_coefficient, coefficient, corrector)?;
    let epsilon = computation.error_indicator(corrector, &input)?;
    ensure!(
        epsilon >= 0.0,
        "Error indicator for coarse element {} must be non-negative, got {}",
        corrector.element_index(),
        epsilon
    );
    Ok(epsilon)
}
