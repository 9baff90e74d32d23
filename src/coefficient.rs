//! Material coefficients on the fine grid and their restriction to patches.
//!
//! A [`Coefficient`] is always defined on a box of coarse elements (the whole world or a patch),
//! refined into fine elements. The values themselves are described by a [`CoefficientField`],
//! whose variant determines which error indicator applies to it.
use crate::grid::{
    convert_p_coordinate_to_index, convert_p_index_to_coordinate, lower_left_p_index_map, num_elements,
    shape_minus_one, World,
};
use eyre::ensure;
use itertools::izip;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoefficientField {
    /// The same value in every fine element.
    Uniform(f64),
    /// One value per fine element.
    FineScale { a_fine: DVector<f64> },
    /// Current fine values together with a reference copy they lag behind.
    Lagging {
        a_fine: DVector<f64>,
        a_lagging: DVector<f64>,
    },
    /// Fine base values scaled by one factor per coarse element.
    CoarseGrained {
        a_base: DVector<f64>,
        r_coarse: DVector<f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coefficient {
    n_patch_coarse: Vec<usize>,
    n_coarse_element: Vec<usize>,
    field: CoefficientField,
}

impl Coefficient {
    pub fn uniform(world: &World, value: f64) -> Self {
        Self {
            n_patch_coarse: world.n_world_coarse().to_vec(),
            n_coarse_element: world.n_coarse_element().to_vec(),
            field: CoefficientField::Uniform(value),
        }
    }

    pub fn fine_scale(world: &World, a_fine: DVector<f64>) -> eyre::Result<Self> {
        Self::from_world_and_field(world, CoefficientField::FineScale { a_fine })
    }

    pub fn lagging(world: &World, a_fine: DVector<f64>, a_lagging: DVector<f64>) -> eyre::Result<Self> {
        Self::from_world_and_field(world, CoefficientField::Lagging { a_fine, a_lagging })
    }

    pub fn coarse_grained(world: &World, a_base: DVector<f64>, r_coarse: DVector<f64>) -> eyre::Result<Self> {
        Self::from_world_and_field(world, CoefficientField::CoarseGrained { a_base, r_coarse })
    }

    /// Constructs a coefficient on the whole world, validating the field against the grid.
    pub fn from_world_and_field(world: &World, field: CoefficientField) -> eyre::Result<Self> {
        let coefficient = Self {
            n_patch_coarse: world.n_world_coarse().to_vec(),
            n_coarse_element: world.n_coarse_element().to_vec(),
            field,
        };
        coefficient.validate()?;
        Ok(coefficient)
    }

    fn validate(&self) -> eyre::Result<()> {
        let num_fine = self.num_fine_elements();
        let num_coarse = self.num_coarse_elements();
        let check_fine = |name: &str, values: &DVector<f64>| -> eyre::Result<()> {
            ensure!(
                values.len() == num_fine,
                "{name} has {} entries, but the grid has {num_fine} fine elements",
                values.len()
            );
            Ok(())
        };
        match &self.field {
            CoefficientField::Uniform(_) => {}
            CoefficientField::FineScale { a_fine } => check_fine("a_fine", a_fine)?,
            CoefficientField::Lagging { a_fine, a_lagging } => {
                check_fine("a_fine", a_fine)?;
                check_fine("a_lagging", a_lagging)?;
            }
            CoefficientField::CoarseGrained { a_base, r_coarse } => {
                check_fine("a_base", a_base)?;
                ensure!(
                    r_coarse.len() == num_coarse,
                    "r_coarse has {} entries, but the grid has {num_coarse} coarse elements",
                    r_coarse.len()
                );
            }
        }
        Ok(())
    }

    pub fn field(&self) -> &CoefficientField {
        &self.field
    }

    pub fn n_patch_coarse(&self) -> &[usize] {
        &self.n_patch_coarse
    }

    pub fn n_coarse_element(&self) -> &[usize] {
        &self.n_coarse_element
    }

    pub fn n_patch_fine(&self) -> Vec<usize> {
        izip!(&self.n_patch_coarse, &self.n_coarse_element)
            .map(|(n, m)| n * m)
            .collect()
    }

    pub fn num_fine_elements(&self) -> usize {
        num_elements(&self.n_patch_fine())
    }

    pub fn num_coarse_elements(&self) -> usize {
        num_elements(&self.n_patch_coarse)
    }

    /// The effective value in every fine element of the patch.
    pub fn a_fine(&self) -> DVector<f64> {
        match &self.field {
            CoefficientField::Uniform(value) => DVector::from_element(self.num_fine_elements(), *value),
            CoefficientField::FineScale { a_fine } | CoefficientField::Lagging { a_fine, .. } => a_fine.clone(),
            CoefficientField::CoarseGrained { a_base, r_coarse } => {
                let coarse_of_fine = self.coarse_element_of_fine_elements();
                DVector::from_iterator(
                    a_base.len(),
                    izip!(a_base.iter(), coarse_of_fine).map(|(a, t)| a * r_coarse[t]),
                )
            }
        }
    }

    /// The linear index of the coarse element containing each fine element.
    fn coarse_element_of_fine_elements(&self) -> Vec<usize> {
        let n_patch_fine = self.n_patch_fine();
        let fine_shape = shape_minus_one(&n_patch_fine);
        let coarse_shape = shape_minus_one(&self.n_patch_coarse);
        (0..self.num_fine_elements())
            .map(|fine_index| {
                let fine_coordinate = convert_p_index_to_coordinate(&fine_shape, fine_index);
                let coarse_coordinate: Vec<_> = izip!(&fine_coordinate, &self.n_coarse_element)
                    .map(|(c, m)| c / m)
                    .collect();
                convert_p_coordinate_to_index(&coarse_shape, &coarse_coordinate)
            })
            .collect()
    }

    /// Restricts the coefficient to a sub-patch given relative to this coefficient's own patch.
    ///
    /// # Panics
    ///
    /// Panics if the sub-patch does not fit inside the patch of this coefficient.
    pub fn localize(&self, i_sub_patch_coarse: &[usize], n_sub_patch_coarse: &[usize]) -> Coefficient {
        assert_eq!(i_sub_patch_coarse.len(), self.n_patch_coarse.len(), "Sub-patch dimension mismatch");
        assert_eq!(n_sub_patch_coarse.len(), self.n_patch_coarse.len(), "Sub-patch dimension mismatch");
        let fits = izip!(i_sub_patch_coarse, n_sub_patch_coarse, &self.n_patch_coarse)
            .all(|(i, n, patch)| *n > 0 && i + n <= *patch);
        assert!(
            fits,
            "Sub-patch at {:?} of size {:?} does not fit inside patch of size {:?}",
            i_sub_patch_coarse, n_sub_patch_coarse, self.n_patch_coarse
        );

        let fine_map = self.fine_sub_patch_map(i_sub_patch_coarse, n_sub_patch_coarse);
        let restrict_fine =
            |values: &DVector<f64>| DVector::from_iterator(fine_map.len(), fine_map.iter().map(|&i| values[i]));

        let field = match &self.field {
            CoefficientField::Uniform(value) => CoefficientField::Uniform(*value),
            CoefficientField::FineScale { a_fine } => CoefficientField::FineScale {
                a_fine: restrict_fine(a_fine),
            },
            CoefficientField::Lagging { a_fine, a_lagging } => CoefficientField::Lagging {
                a_fine: restrict_fine(a_fine),
                a_lagging: restrict_fine(a_lagging),
            },
            CoefficientField::CoarseGrained { a_base, r_coarse } => {
                let coarse_shape = shape_minus_one(&self.n_patch_coarse);
                let start = convert_p_coordinate_to_index(&coarse_shape, i_sub_patch_coarse);
                let coarse_map = lower_left_p_index_map(&shape_minus_one(n_sub_patch_coarse), &coarse_shape);
                CoefficientField::CoarseGrained {
                    a_base: restrict_fine(a_base),
                    r_coarse: DVector::from_iterator(
                        coarse_map.len(),
                        coarse_map.iter().map(|offset| r_coarse[start + offset]),
                    ),
                }
            }
        };

        Coefficient {
            n_patch_coarse: n_sub_patch_coarse.to_vec(),
            n_coarse_element: self.n_coarse_element.clone(),
            field,
        }
    }

    /// Fine element indices of a sub-patch within this coefficient's fine element numbering.
    fn fine_sub_patch_map(&self, i_sub_patch_coarse: &[usize], n_sub_patch_coarse: &[usize]) -> Vec<usize> {
        let fine_shape = shape_minus_one(&self.n_patch_fine());
        let i_sub_patch_fine: Vec<_> = izip!(i_sub_patch_coarse, &self.n_coarse_element)
            .map(|(i, m)| i * m)
            .collect();
        let n_sub_patch_fine: Vec<_> = izip!(n_sub_patch_coarse, &self.n_coarse_element)
            .map(|(n, m)| n * m)
            .collect();
        let start = convert_p_coordinate_to_index(&fine_shape, &i_sub_patch_fine);
        lower_left_p_index_map(&shape_minus_one(&n_sub_patch_fine), &fine_shape)
            .into_iter()
            .map(|offset| start + offset)
            .collect()
    }
}

/// Elementwise contrast between an old and a new coefficient field.
///
/// Returns `(delta, kappa)` with `delta = |a_old - a_new| / sqrt(a_old a_new)` and
/// `kappa = |a_old / a_new|`.
///
/// # Panics
///
/// Panics if the two fields have different length.
pub fn coarse_grained_contrast(a_old: &DVector<f64>, a_new: &DVector<f64>) -> (DVector<f64>, DVector<f64>) {
    assert_eq!(a_old.len(), a_new.len(), "Coefficient fields must have the same length");
    let delta = a_old.zip_map(a_new, |old, new| (old - new).abs() / (old * new).sqrt());
    let kappa = a_old.zip_map(a_new, |old, new| (old / new).abs());
    (delta, kappa)
}
