//! The boundary between the corrector engine and the numerical patch computations.
//!
//! The local saddle-point problems that produce element correctors are solved by an
//! implementation of [`PatchComputation`]. The engine never calls it for single elements while
//! updating correctors. Instead it hands whole batches of [`WorkItem`]s to a [`Dispatcher`],
//! which is free to reorder or parallelize the work as long as the results it returns are aligned
//! with the submitted items.
use crate::coefficient::Coefficient;
use crate::corrector::{CorrectorKind, ElementCorrector, WorkItem};
use crate::grid::World;
use crate::indicator::IndicatorInput;
use eyre::WrapErr;
use nalgebra::{DVector, DVectorView};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Everything a patch computation needs besides the work item itself.
#[derive(Debug, Clone, Copy)]
pub struct CorrectorContext<'a> {
    pub world: &'a World,
    pub coefficient: &'a Coefficient,
    /// Number of coarse element layers around an element in its patch.
    pub k: usize,
    pub clear_fine_quantities: bool,
    pub kind: CorrectorKind,
}

pub trait PatchComputation: Sync {
    /// Computes the corrector of a single coarse element.
    fn compute_element_corrector(
        &self,
        context: &CorrectorContext,
        item: &WorkItem,
    ) -> eyre::Result<ElementCorrector>;

    /// Estimates how much the given corrector would change if recomputed.
    ///
    /// Must return a non-negative number.
    fn error_indicator(&self, corrector: &ElementCorrector, input: &IndicatorInput) -> eyre::Result<f64>;

    /// Computes the fine-scale correction of the given right-hand sides on the corrector's patch.
    ///
    /// The right-hand sides are given on the fine nodes of the coarse element. The result is a
    /// vector over the fine nodes of the patch.
    fn compute_element_correction(
        &self,
        world: &World,
        corrector: &ElementCorrector,
        coefficient_patch: &Coefficient,
        a_rhs: Option<DVectorView<f64>>,
        m_rhs: Option<DVectorView<f64>>,
    ) -> eyre::Result<DVector<f64>>;
}

pub trait Dispatcher {
    /// Computes one corrector per work item.
    ///
    /// The returned correctors are in the same order as `items`. An error for any single item
    /// fails the whole batch.
    fn map_computations<P>(
        &self,
        computation: &P,
        context: &CorrectorContext,
        items: &[WorkItem],
    ) -> eyre::Result<Vec<ElementCorrector>>
    where
        P: PatchComputation + ?Sized;
}

fn compute_item<P>(computation: &P, context: &CorrectorContext, item: &WorkItem) -> eyre::Result<ElementCorrector>
where
    P: PatchComputation + ?Sized,
{
    computation
        .compute_element_corrector(context, item)
        .wrap_err_with(|| format!("Failed to compute corrector for coarse element {}", item.element_index))
}

/// Computes all work items on the calling thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialDispatcher;

impl Dispatcher for SerialDispatcher {
    fn map_computations<P>(
        &self,
        computation: &P,
        context: &CorrectorContext,
        items: &[WorkItem],
    ) -> eyre::Result<Vec<ElementCorrector>>
    where
        P: PatchComputation + ?Sized,
    {
        items
            .iter()
            .map(|item| compute_item(computation, context, item))
            .collect()
    }
}

/// Computes work items on a dedicated thread pool owned by the dispatcher.
///
/// The worker threads live exactly as long as the dispatcher.
#[derive(Debug)]
pub struct ParallelDispatcher {
    pool: ThreadPool,
}

impl ParallelDispatcher {
    /// Creates a dispatcher with the given number of worker threads.
    ///
    /// With `num_threads == 0`, the number of threads is chosen by `rayon`.
    pub fn new(num_threads: usize) -> eyre::Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("pglod-corrector-{index}"))
            .build()
            .wrap_err("Failed to build corrector worker pool")?;
        Ok(Self { pool })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Releases the worker threads.
    pub fn shutdown(self) {
        drop(self.pool);
    }
}

impl Dispatcher for ParallelDispatcher {
    fn map_computations<P>(
        &self,
        computation: &P,
        context: &CorrectorContext,
        items: &[WorkItem],
    ) -> eyre::Result<Vec<ElementCorrector>>
    where
        P: PatchComputation + ?Sized,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        self.pool.install(|| {
            items
                .par_iter()
                .map(|item| compute_item(computation, context, item))
                .collect()
        })
    }
}
