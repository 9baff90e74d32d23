//! Indexing for tensor-product coarse and fine grids.
//!
//! A grid shape `n` counts *elements* along each axis, so that a grid of shape `n` has
//! `n[i] + 1` points along axis `i`. Linear point indices are laid out with the first axis
//! varying fastest. Element indices use the same conventions applied to the shape `n - 1`.
use eyre::ensure;
use itertools::izip;
use serde::{Deserialize, Serialize};

/// The total number of points in a grid of shape `n`.
pub fn num_points(n: &[usize]) -> usize {
    n.iter().map(|n_i| n_i + 1).product()
}

/// The total number of elements in a grid of shape `n`.
pub fn num_elements(n: &[usize]) -> usize {
    n.iter().product()
}

/// Returns `n - 1` componentwise, i.e. the shape whose points are the elements of `n`.
///
/// # Panics
///
/// Panics if any extent of `n` is zero.
pub(crate) fn shape_minus_one(n: &[usize]) -> Vec<usize> {
    n.iter()
        .map(|&n_i| {
            assert!(n_i > 0, "Grid extents must be positive");
            n_i - 1
        })
        .collect()
}

fn point_strides(n: &[usize]) -> Vec<usize> {
    let mut strides = Vec::with_capacity(n.len());
    let mut stride = 1;
    for n_i in n {
        strides.push(stride);
        stride *= n_i + 1;
    }
    strides
}

/// Converts a linear point index in a grid of shape `n` to its coordinate.
pub fn convert_p_index_to_coordinate(n: &[usize], index: usize) -> Vec<usize> {
    izip!(point_strides(n), n)
        .map(|(stride, n_i)| (index / stride) % (n_i + 1))
        .collect()
}

/// Converts a point coordinate in a grid of shape `n` to its linear index.
///
/// # Panics
///
/// Panics if the coordinate does not have the same dimension as the grid.
pub fn convert_p_coordinate_to_index(n: &[usize], coordinate: &[usize]) -> usize {
    assert_eq!(n.len(), coordinate.len(), "Coordinate dimension must match grid dimension");
    izip!(point_strides(n), coordinate)
        .map(|(stride, c)| stride * c)
        .sum()
}

/// Linear indices in the grid `n_to` of the points of a box of shape `n_from` anchored at
/// the origin, where consecutive box points along axis `i` are `n_step[i]` points apart.
///
/// Box points are enumerated with the first axis varying fastest, so the returned map can be
/// offset by the linear index of any anchor point to address a translated box.
///
/// # Panics
///
/// Panics if the three shapes do not share the same dimension.
pub fn p_index_map(n_from: &[usize], n_to: &[usize], n_step: &[usize]) -> Vec<usize> {
    assert_eq!(n_from.len(), n_to.len(), "Shapes must have the same dimension");
    assert_eq!(n_from.len(), n_step.len(), "Step must have the same dimension as the shapes");

    let mut indices = vec![0];
    for (&extent, stride, &step) in izip!(n_from, point_strides(n_to), n_step) {
        let offset = stride * step;
        let previous = std::mem::take(&mut indices);
        indices = (0..=extent)
            .flat_map(|j| previous.iter().map(move |idx| idx + j * offset))
            .collect();
    }
    indices
}

/// Same as [`p_index_map`] with unit step along every axis.
pub fn lower_left_p_index_map(n_from: &[usize], n_to: &[usize]) -> Vec<usize> {
    p_index_map(n_from, n_to, &vec![1; n_from.len()])
}

/// A box of coarse elements, given by the coordinate of its lower-left coarse element and its
/// extent in coarse elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatchDescriptor {
    i_patch_world_coarse: Vec<usize>,
    n_patch_coarse: Vec<usize>,
}

impl PatchDescriptor {
    /// # Panics
    ///
    /// Panics if origin and size have different dimension or the patch is empty along some axis.
    pub fn new(i_patch_world_coarse: Vec<usize>, n_patch_coarse: Vec<usize>) -> Self {
        assert_eq!(
            i_patch_world_coarse.len(),
            n_patch_coarse.len(),
            "Patch origin and size must have the same dimension"
        );
        assert!(n_patch_coarse.iter().all(|&n| n > 0), "Patch must be non-empty");
        Self {
            i_patch_world_coarse,
            n_patch_coarse,
        }
    }

    pub fn i_patch_world_coarse(&self) -> &[usize] {
        &self.i_patch_world_coarse
    }

    pub fn n_patch_coarse(&self) -> &[usize] {
        &self.n_patch_coarse
    }
}

/// Immutable description of the coarse and fine discretization.
///
/// The fine grid refines every coarse element uniformly into `n_coarse_element` fine elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct World {
    n_world_coarse: Vec<usize>,
    n_coarse_element: Vec<usize>,
}

impl World {
    pub fn new(n_world_coarse: impl Into<Vec<usize>>, n_coarse_element: impl Into<Vec<usize>>) -> eyre::Result<Self> {
        let n_world_coarse = n_world_coarse.into();
        let n_coarse_element = n_coarse_element.into();
        ensure!(!n_world_coarse.is_empty(), "World must have at least one dimension");
        ensure!(
            n_world_coarse.len() == n_coarse_element.len(),
            "Coarse grid has dimension {} but coarse element refinement has dimension {}",
            n_world_coarse.len(),
            n_coarse_element.len()
        );
        ensure!(
            n_world_coarse.iter().chain(&n_coarse_element).all(|&n| n > 0),
            "All grid extents must be positive"
        );
        Ok(Self {
            n_world_coarse,
            n_coarse_element,
        })
    }

    pub fn dim(&self) -> usize {
        self.n_world_coarse.len()
    }

    pub fn n_world_coarse(&self) -> &[usize] {
        &self.n_world_coarse
    }

    pub fn n_coarse_element(&self) -> &[usize] {
        &self.n_coarse_element
    }

    pub fn n_world_fine(&self) -> Vec<usize> {
        izip!(&self.n_world_coarse, &self.n_coarse_element)
            .map(|(n, m)| n * m)
            .collect()
    }

    pub fn num_coarse_elements(&self) -> usize {
        num_elements(&self.n_world_coarse)
    }

    pub fn num_coarse_nodes(&self) -> usize {
        num_points(&self.n_world_coarse)
    }

    pub fn num_fine_elements(&self) -> usize {
        num_elements(&self.n_world_fine())
    }

    pub fn num_fine_nodes(&self) -> usize {
        num_points(&self.n_world_fine())
    }

    /// Number of coarse nodes of a single coarse element, i.e. `2^d`.
    pub fn num_element_coarse_nodes(&self) -> usize {
        1 << self.dim()
    }

    /// The coordinate of the coarse element with the given linear index.
    ///
    /// # Panics
    ///
    /// Panics if the index is out of bounds.
    pub fn coarse_element_coordinate(&self, element_index: usize) -> Vec<usize> {
        assert!(
            element_index < self.num_coarse_elements(),
            "Coarse element index {element_index} out of bounds"
        );
        convert_p_index_to_coordinate(&shape_minus_one(&self.n_world_coarse), element_index)
    }

    /// Global coarse node indices of the corners of the given coarse element.
    pub fn coarse_element_nodes(&self, element_index: usize) -> Vec<usize> {
        let coordinate = self.coarse_element_coordinate(element_index);
        let start = convert_p_coordinate_to_index(&self.n_world_coarse, &coordinate);
        lower_left_p_index_map(&vec![1; self.dim()], &self.n_world_coarse)
            .into_iter()
            .map(|offset| start + offset)
            .collect()
    }

    /// Global fine node indices of the nodes inside the given coarse element.
    pub fn fine_element_nodes(&self, element_index: usize) -> Vec<usize> {
        let n_world_fine = self.n_world_fine();
        let coordinate = self.coarse_element_coordinate(element_index);
        let fine_coordinate: Vec<_> = izip!(&coordinate, &self.n_coarse_element)
            .map(|(c, m)| c * m)
            .collect();
        let start = convert_p_coordinate_to_index(&n_world_fine, &fine_coordinate);
        lower_left_p_index_map(&self.n_coarse_element, &n_world_fine)
            .into_iter()
            .map(|offset| start + offset)
            .collect()
    }

    /// Global coarse node indices of all coarse nodes in the patch.
    pub fn coarse_patch_nodes(&self, patch: &PatchDescriptor) -> Vec<usize> {
        self.assert_patch_in_world(patch);
        let start = convert_p_coordinate_to_index(&self.n_world_coarse, patch.i_patch_world_coarse());
        lower_left_p_index_map(patch.n_patch_coarse(), &self.n_world_coarse)
            .into_iter()
            .map(|offset| start + offset)
            .collect()
    }

    /// Global fine node indices of all fine nodes in the patch.
    pub fn fine_patch_nodes(&self, patch: &PatchDescriptor) -> Vec<usize> {
        self.assert_patch_in_world(patch);
        let n_world_fine = self.n_world_fine();
        let i_patch_world_fine: Vec<_> = izip!(patch.i_patch_world_coarse(), &self.n_coarse_element)
            .map(|(i, m)| i * m)
            .collect();
        let n_patch_fine: Vec<_> = izip!(patch.n_patch_coarse(), &self.n_coarse_element)
            .map(|(n, m)| n * m)
            .collect();
        let start = convert_p_coordinate_to_index(&n_world_fine, &i_patch_world_fine);
        lower_left_p_index_map(&n_patch_fine, &n_world_fine)
            .into_iter()
            .map(|offset| start + offset)
            .collect()
    }

    /// The patch of `k` layers of coarse elements around the given coarse element, clipped to
    /// the world boundary.
    pub fn element_patch(&self, element_index: usize, k: usize) -> PatchDescriptor {
        let coordinate = self.coarse_element_coordinate(element_index);
        let (origin, size): (Vec<_>, Vec<_>) = izip!(&coordinate, &self.n_world_coarse)
            .map(|(&c, &n)| {
                let start = c.saturating_sub(k);
                let end = usize::min(c + k + 1, n);
                (start, end - start)
            })
            .unzip();
        PatchDescriptor::new(origin, size)
    }

    fn assert_patch_in_world(&self, patch: &PatchDescriptor) {
        assert_eq!(patch.n_patch_coarse().len(), self.dim(), "Patch dimension must match world");
        let fits = izip!(patch.i_patch_world_coarse(), patch.n_patch_coarse(), &self.n_world_coarse)
            .all(|(i, n, world)| i + n <= *world);
        assert!(fits, "Patch {:?} does not fit inside the world", patch);
    }
}
