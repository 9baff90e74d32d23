//! Petrov-Galerkin LOD with incremental corrector updates under perturbed coefficients.
//!
//! [`VcPetrovGalerkinLod`] keeps one element corrector per coarse element for an unperturbed
//! *origin* coefficient. When the coefficient changes, [`VcPetrovGalerkinLod::update_correctors`]
//! compares every element against the origin with an error indicator and recomputes only the
//! correctors whose indicator exceeds a tolerance. The global coarse operators are assembled on
//! demand from whichever correctors are currently active and cached until the next change.
//!
//! Three views of the correctors are maintained:
//!
//! - the *origin* view, computed once by [`VcPetrovGalerkinLod::origin_correctors`],
//! - the *testing* view, the baseline for trial updates,
//! - the *active* view, the result of the most recent update, used for assembly.
use crate::assembly::{self, Operator, OperatorCache};
use crate::coefficient::Coefficient;
use crate::corrector::arena::{CorrectorArena, CorrectorStatus, CorrectorView};
use crate::corrector::{CorrectorKind, ElementCorrector, WorkItem};
use crate::dispatch::{CorrectorContext, Dispatcher, PatchComputation, SerialDispatcher};
use crate::grid::World;
use crate::indicator::measure_error_indicator;
use eyre::{ensure, WrapErr};
use itertools::izip;
use log::{debug, info, log, trace, Level};
use nalgebra::{DVector, DVectorView};
use nalgebra_sparse::CscMatrix;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Parameters of the local corrector problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodSettings {
    /// Number of coarse element layers around each element in its patch.
    pub k: usize,
    /// Whether correctors discard their fine-scale data after computing their coarse summary.
    pub clear_fine_quantities: bool,
}

impl Default for LodSettings {
    fn default() -> Self {
        Self {
            k: 2,
            clear_fine_quantities: true,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdateOptions {
    /// Trial update: start from the testing view and trust previously stored indicators
    /// instead of measuring them again.
    pub testing: bool,
    /// Whether stale correctors are actually recomputed. Without it, stale elements are left
    /// without a corrector, which is only useful to estimate the cost of an update.
    pub computing: bool,
    /// Part of a Monte Carlo loop, suppresses the per-update summary.
    pub monte_carlo: bool,
}

impl Default for UpdateOptions {
    fn default() -> Self {
        Self {
            testing: false,
            computing: true,
            monte_carlo: false,
        }
    }
}

impl UpdateOptions {
    pub fn testing() -> Self {
        Self {
            testing: true,
            ..Self::default()
        }
    }

    pub fn dry_run() -> Self {
        Self {
            computing: false,
            ..Self::default()
        }
    }

    pub fn with_monte_carlo(self, monte_carlo: bool) -> Self {
        Self { monte_carlo, ..self }
    }
}

/// Outcome of a single corrector update.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    /// `1 - age` per coarse element: `1` for a corrector recomputed in this update,
    /// `1 - n` for one left unchanged for `n` updates.
    pub freshness: DVector<f64>,
    /// The error indicator per coarse element used for the decision.
    pub indicators: Vec<f64>,
    /// Coarse elements whose correctors were invalidated, in ascending order.
    pub recomputed: Vec<usize>,
}

impl UpdateReport {
    pub fn recompute_count(&self) -> usize {
        self.recomputed.len()
    }

    /// Percentage of coarse elements whose correctors were invalidated.
    pub fn recompute_percentage(&self) -> f64 {
        if self.freshness.is_empty() {
            0.0
        } else {
            100.0 * self.recomputed.len() as f64 / self.freshness.len() as f64
        }
    }
}

#[derive(Debug, Clone)]
struct CorrectorViews {
    origin: CorrectorView,
    testing: CorrectorView,
    active: Option<CorrectorView>,
}

#[derive(Debug, Clone)]
struct RhsCorrectorViews {
    origin: CorrectorView,
    active: Option<CorrectorView>,
}

/// Petrov-Galerkin LOD for coefficients with defects.
///
/// The engine owns its [`Dispatcher`]. Worker resources are released when the engine is dropped
/// or handed back through [`into_parts`](Self::into_parts).
///
/// The engine is not reentrant: all mutating operations take `&mut self`.
#[derive(Debug)]
pub struct VcPetrovGalerkinLod<P, D = SerialDispatcher> {
    world: World,
    origin_coefficient: Coefficient,
    settings: LodSettings,
    computation: P,
    dispatcher: D,

    arena: CorrectorArena,
    views: Option<CorrectorViews>,
    rhs_views: Option<RhsCorrectorViews>,
    statuses: Vec<CorrectorStatus>,
    ages: Option<Vec<usize>>,
    epsilon_list: Option<Vec<f64>>,
    current_testing_corrector: Option<usize>,

    operators: OperatorCache,
}

fn ensure_coefficient_on_world(world: &World, coefficient: &Coefficient) -> eyre::Result<()> {
    ensure!(
        coefficient.n_patch_coarse() == world.n_world_coarse()
            && coefficient.n_coarse_element() == world.n_coarse_element(),
        "Coefficient on {:?} coarse elements refined by {:?} does not cover the world ({:?} refined by {:?})",
        coefficient.n_patch_coarse(),
        coefficient.n_coarse_element(),
        world.n_world_coarse(),
        world.n_coarse_element()
    );
    Ok(())
}

impl<P, D> VcPetrovGalerkinLod<P, D>
where
    P: PatchComputation,
    D: Dispatcher,
{
    pub fn new(
        world: World,
        origin_coefficient: Coefficient,
        settings: LodSettings,
        computation: P,
        dispatcher: D,
    ) -> eyre::Result<Self> {
        ensure_coefficient_on_world(&world, &origin_coefficient).wrap_err("Invalid origin coefficient")?;
        let num_elements = world.num_coarse_elements();
        Ok(Self {
            world,
            origin_coefficient,
            settings,
            computation,
            dispatcher,
            arena: CorrectorArena::new(),
            views: None,
            rhs_views: None,
            statuses: vec![CorrectorStatus::Stale; num_elements],
            ages: None,
            epsilon_list: None,
            current_testing_corrector: None,
            operators: OperatorCache::default(),
        })
    }

    /// Releases the engine, handing back the patch computation and the dispatcher.
    pub fn into_parts(self) -> (P, D) {
        (self.computation, self.dispatcher)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn settings(&self) -> &LodSettings {
        &self.settings
    }

    pub fn origin_coefficient(&self) -> &Coefficient {
        &self.origin_coefficient
    }

    pub fn computation(&self) -> &P {
        &self.computation
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    fn num_elements(&self) -> usize {
        self.world.num_coarse_elements()
    }

    fn work_item(&self, element_index: usize) -> WorkItem {
        WorkItem {
            element_index,
            element_coordinate: self.world.coarse_element_coordinate(element_index),
        }
    }

    fn bootstrapped_views(&self) -> &CorrectorViews {
        self.views
            .as_ref()
            .unwrap_or_else(|| panic!("Origin correctors have not been computed"))
    }

    fn dispatch(
        &self,
        kind: CorrectorKind,
        coefficient: &Coefficient,
        items: &[WorkItem],
    ) -> eyre::Result<Vec<ElementCorrector>> {
        debug!("Dispatching {} {:?} corrector computations", items.len(), kind);
        let context = CorrectorContext {
            world: &self.world,
            coefficient,
            k: self.settings.k,
            clear_fine_quantities: self.settings.clear_fine_quantities,
            kind,
        };
        let correctors = self
            .dispatcher
            .map_computations(&self.computation, &context, items)?;
        ensure!(
            correctors.len() == items.len(),
            "Dispatcher returned {} correctors for {} work items",
            correctors.len(),
            items.len()
        );
        for (item, corrector) in izip!(items, &correctors) {
            ensure!(
                corrector.element_index() == item.element_index && corrector.kind() == kind,
                "Dispatcher returned a {:?} corrector for element {} in place of a {:?} corrector for element {}",
                corrector.kind(),
                corrector.element_index(),
                kind,
                item.element_index
            );
        }
        Ok(correctors)
    }

    /// Computes correctors of the given kind for every coarse element under the origin coefficient.
    fn compute_full_view(&mut self, kind: CorrectorKind) -> eyre::Result<CorrectorView> {
        let num_elements = self.num_elements();
        let items: Vec<_> = (0..num_elements).map(|t| self.work_item(t)).collect();
        let correctors = self.dispatch(kind, &self.origin_coefficient, &items)?;

        let mut view = CorrectorView::empty(num_elements);
        for (item, corrector) in izip!(&items, correctors) {
            let id = self.arena.insert(item.element_index, corrector);
            view.set(item.element_index, id);
        }
        Ok(view)
    }

    fn collect_garbage(&mut self) {
        let mut views = Vec::new();
        if let Some(v) = &self.views {
            views.extend([&v.origin, &v.testing]);
            views.extend(v.active.as_ref());
        }
        if let Some(v) = &self.rhs_views {
            views.push(&v.origin);
            views.extend(v.active.as_ref());
        }
        let dropped = self.arena.retain_referenced(views);
        trace!("Dropped {} unreferenced correctors", dropped);
    }

    /// Computes the correctors of every coarse element for the origin coefficient.
    ///
    /// Afterwards the origin, testing and active views all refer to the new correctors,
    /// every element is fresh and has age zero.
    pub fn origin_correctors(&mut self) -> eyre::Result<()> {
        self.operators.invalidate();
        let origin = self
            .compute_full_view(CorrectorKind::Basis)
            .wrap_err("Failed to compute origin correctors")?;

        let num_elements = self.num_elements();
        self.views = Some(CorrectorViews {
            testing: origin.clone(),
            active: Some(origin.clone()),
            origin,
        });
        self.statuses = vec![CorrectorStatus::Fresh; num_elements];
        self.ages = Some(vec![0; num_elements]);
        self.collect_garbage();
        info!("Computed origin correctors for {} coarse elements", num_elements);
        Ok(())
    }

    /// Computes the right-hand-side correctors of every coarse element for the origin coefficient.
    pub fn origin_rhs_correctors(&mut self) -> eyre::Result<()> {
        self.operators.invalidate();
        let origin = self
            .compute_full_view(CorrectorKind::Rhs)
            .wrap_err("Failed to compute origin right-hand-side correctors")?;
        self.rhs_views = Some(RhsCorrectorViews {
            active: Some(origin.clone()),
            origin,
        });
        self.collect_garbage();
        info!("Computed origin right-hand-side correctors for {} coarse elements", self.num_elements());
        Ok(())
    }

    /// Makes the origin view the baseline of subsequent trial updates.
    ///
    /// # Panics
    ///
    /// Panics if the origin correctors have not been computed.
    pub fn correctors_to_origin(&mut self) {
        assert!(self.views.is_some(), "Origin correctors have not been computed");
        if let Some(views) = &mut self.views {
            views.testing = views.origin.clone();
        }
        self.collect_garbage();
    }

    /// Updates the active correctors for a new coefficient.
    ///
    /// For every coarse element, the error indicator against the origin correctors is compared to
    /// `epsilon_tol`. Elements whose indicator strictly exceeds the tolerance are recomputed in a
    /// single batch, all others keep the corrector of the baseline view.
    ///
    /// In a trial update (`options.testing`), the baseline is the testing view and the stored
    /// indicators are reused instead of measured. Every element recomputed in a trial update has
    /// its stored indicator reset to zero.
    ///
    /// A tolerance of exactly zero has special meaning: the measured indicators are kept as the
    /// engine's indicator memory, the testing view is left untouched and the update is logged
    /// element by element at info level (unless it is a dry run or part of a Monte Carlo loop).
    ///
    /// Nothing is committed if the indicator evaluation or the recomputation fails. The cached
    /// operators are invalidated in any case.
    ///
    /// # Panics
    ///
    /// Panics if the origin correctors have not been computed.
    pub fn update_correctors(
        &mut self,
        coefficient: &Coefficient,
        epsilon_tol: f64,
        options: UpdateOptions,
    ) -> eyre::Result<UpdateReport> {
        assert!(
            self.views.is_some(),
            "Origin correctors must be computed before correctors can be updated"
        );
        self.operators.invalidate();
        ensure!(
            epsilon_tol >= 0.0,
            "Tolerance must be non-negative, got {}",
            epsilon_tol
        );
        ensure_coefficient_on_world(&self.world, coefficient)?;

        let num_elements = self.num_elements();
        let verbose = epsilon_tol == 0.0 && options.computing && !options.monte_carlo;
        let decision_level = if verbose { Level::Info } else { Level::Debug };

        let mut ages = self
            .ages
            .clone()
            .unwrap_or_else(|| vec![0; num_elements]);
        let mut indicators = self
            .epsilon_list
            .clone()
            .unwrap_or_else(|| vec![f64::NAN; num_elements]);
        let mut current_testing_corrector = self.current_testing_corrector;

        let views = self.bootstrapped_views();
        let mut working = if options.testing {
            views.testing.clone()
        } else {
            views.origin.clone()
        };
        let mut statuses: Vec<_> = working
            .entries()
            .iter()
            .map(|entry| match entry {
                Some(_) => CorrectorStatus::Fresh,
                None => CorrectorStatus::Stale,
            })
            .collect();

        let mut items = Vec::new();
        for element_index in 0..num_elements {
            trace!("Examining coarse element {} / {}", element_index, num_elements);
            ages[element_index] += 1;

            let epsilon = if options.testing {
                indicators[element_index]
            } else {
                let corrector = self
                    .origin_corrector(element_index)
                    .unwrap_or_else(|| panic!("Origin corrector of element {} is missing", element_index));
                let epsilon =
                    measure_error_indicator(&self.computation, &self.origin_coefficient, coefficient, corrector)
                        .wrap_err_with(|| {
                            format!("Failed to evaluate error indicator of coarse element {}", element_index)
                        })?;
                indicators[element_index] = epsilon;
                epsilon
            };

            if epsilon > epsilon_tol {
                log!(decision_level, "Element {}: epsilon = {}, recompute", element_index, epsilon);
                if options.testing {
                    indicators[element_index] = 0.0;
                    current_testing_corrector = Some(element_index);
                }
                items.push(self.work_item(element_index));
                working.clear(element_index);
                statuses[element_index] = statuses[element_index].breached();
                ages[element_index] = 0;
            } else {
                log!(decision_level, "Element {}: epsilon = {}, keep", element_index, epsilon);
            }
        }

        let recompute_percentage = 100.0 * items.len() as f64 / num_elements as f64;
        let summary_level = if (verbose || options.testing) && !options.monte_carlo {
            Level::Info
        } else {
            Level::Debug
        };
        log!(summary_level, "To be recomputed: {}%", recompute_percentage);

        if options.computing {
            for item in &items {
                statuses[item.element_index] = statuses[item.element_index].dispatched();
            }
            let correctors = self
                .dispatch(CorrectorKind::Basis, coefficient, &items)
                .wrap_err("Failed to recompute stale correctors")?;
            for (item, corrector) in izip!(&items, correctors) {
                let id = self.arena.insert(item.element_index, corrector);
                working.set(item.element_index, id);
                statuses[item.element_index] = statuses[item.element_index].merged();
            }
        } else {
            info!("Not recomputed: {} correctors left stale", items.len());
        }

        if let Some(views) = &mut self.views {
            if epsilon_tol != 0.0 {
                views.testing = working.clone();
            }
            views.active = Some(working);
        }
        if let Some(rhs_views) = &mut self.rhs_views {
            if rhs_views.active.is_none() {
                rhs_views.active = Some(rhs_views.origin.clone());
            }
        }
        if options.testing || epsilon_tol == 0.0 {
            self.epsilon_list = Some(indicators.clone());
        }
        let freshness = DVector::from_iterator(num_elements, ages.iter().map(|&age| 1.0 - age as f64));
        self.ages = Some(ages);
        self.statuses = statuses;
        self.current_testing_corrector = current_testing_corrector;
        self.collect_garbage();

        Ok(UpdateReport {
            freshness,
            indicators,
            recomputed: items.iter().map(|item| item.element_index).collect(),
        })
    }

    /// Measures the error indicator of every coarse element against the origin correctors.
    ///
    /// No state of the engine is modified.
    ///
    /// # Panics
    ///
    /// Panics if the origin correctors have not been computed.
    pub fn error_indicator(&self, coefficient: &Coefficient) -> eyre::Result<Vec<f64>> {
        let views = self.bootstrapped_views();
        ensure_coefficient_on_world(&self.world, coefficient)?;
        (0..self.num_elements())
            .map(|element_index| {
                let corrector = self
                    .resolve(&views.origin, element_index)
                    .unwrap_or_else(|| panic!("Origin corrector of element {} is missing", element_index));
                measure_error_indicator(&self.computation, &self.origin_coefficient, coefficient, corrector)
                    .wrap_err_with(|| format!("Failed to evaluate error indicator of coarse element {}", element_index))
            })
            .collect()
    }

    /// Discards the active correctors. Assembly is impossible until the next update.
    ///
    /// The next committed update restores the active right-hand-side correctors from their origin.
    pub fn clear_correctors(&mut self) {
        if let Some(views) = &mut self.views {
            views.active = None;
        }
        if let Some(views) = &mut self.rhs_views {
            views.active = None;
        }
        self.operators.invalidate();
        self.collect_garbage();
    }

    /// Computes the fine-scale correction of the given fine right-hand sides.
    ///
    /// The local corrections of all coarse elements, computed with the origin coefficient and the
    /// active correctors, are summed into a single fine nodal vector.
    ///
    /// # Panics
    ///
    /// Panics if there are no active correctors or some element lacks a corrector.
    pub fn compute_correction(
        &self,
        a_rhs_full: Option<&DVector<f64>>,
        m_rhs_full: Option<&DVector<f64>>,
    ) -> eyre::Result<DVector<f64>> {
        let active = self.active_view().unwrap_or_else(|| panic!("No active correctors"));
        let np_fine = self.world.num_fine_nodes();
        for rhs in a_rhs_full.iter().chain(&m_rhs_full) {
            ensure!(
                rhs.len() == np_fine,
                "Right-hand side has {} entries, but the fine grid has {} nodes",
                rhs.len(),
                np_fine
            );
        }

        let gather =
            |rhs: &DVector<f64>, nodes: &[usize]| DVector::from_iterator(nodes.len(), nodes.iter().map(|&i| rhs[i]));

        let mut u_fine = DVector::zeros(np_fine);
        for element_index in 0..self.num_elements() {
            trace!("Correcting coarse element {} / {}", element_index, self.num_elements());
            let corrector = self
                .resolve(active, element_index)
                .unwrap_or_else(|| panic!("Coarse element {} has no active corrector", element_index));
            let coefficient_patch = self
                .origin_coefficient
                .localize(corrector.i_patch_world_coarse(), corrector.n_patch_coarse());

            let element_nodes = self.world.fine_element_nodes(element_index);
            let a_rhs = a_rhs_full.map(|rhs| gather(rhs, &element_nodes));
            let m_rhs = m_rhs_full.map(|rhs| gather(rhs, &element_nodes));

            let correction = self
                .computation
                .compute_element_correction(
                    &self.world,
                    corrector,
                    &coefficient_patch,
                    a_rhs.as_ref().map(|v| DVectorView::from(v)),
                    m_rhs.as_ref().map(|v| DVectorView::from(v)),
                )
                .wrap_err_with(|| format!("Failed to compute correction of coarse element {}", element_index))?;

            let patch_nodes = self.world.fine_patch_nodes(corrector.patch());
            ensure!(
                correction.len() == patch_nodes.len(),
                "Correction of coarse element {} has {} entries, but its patch has {} fine nodes",
                element_index,
                correction.len(),
                patch_nodes.len()
            );
            for (&node, &value) in izip!(&patch_nodes, correction.iter()) {
                u_fine[node] += value;
            }
        }
        Ok(u_fine)
    }

    fn resolve(&self, view: &CorrectorView, element_index: usize) -> Option<&ElementCorrector> {
        view.get(element_index).and_then(|id| self.arena.get(id))
    }

    fn resolve_complete(&self, view: &CorrectorView) -> Vec<&ElementCorrector> {
        (0..view.len())
            .map(|element_index| {
                self.resolve(view, element_index)
                    .unwrap_or_else(|| panic!("Coarse element {} has no corrector", element_index))
            })
            .collect()
    }

    fn active_correctors(&self) -> Vec<&ElementCorrector> {
        let active = self
            .active_view()
            .unwrap_or_else(|| panic!("No active correctors to assemble from"));
        self.resolve_complete(active)
    }

    fn active_rhs_correctors(&self) -> Vec<&ElementCorrector> {
        let active = self
            .rhs_views
            .as_ref()
            .and_then(|views| views.active.as_ref())
            .unwrap_or_else(|| panic!("No active right-hand-side correctors to assemble from"));
        self.resolve_complete(active)
    }

    fn assemble_cached(&mut self, operator: Operator) -> Arc<CscMatrix<f64>> {
        if let Some(matrix) = self.operators.get(operator) {
            return Arc::clone(matrix);
        }
        let matrix = match operator {
            Operator::MsStiffness => assembly::assemble_ms_stiffness_matrix(&self.world, &self.active_correctors()),
            Operator::Stiffness => assembly::assemble_stiffness_matrix(&self.world, &self.active_correctors()),
            Operator::MsRhs => assembly::assemble_ms_rhs_matrix(&self.world, &self.active_rhs_correctors()),
            Operator::BasisCorrectors => assembly::assemble_basis_correctors(&self.world, &self.active_correctors()),
        };
        self.operators.insert(operator, matrix)
    }

    /// The multiscale stiffness matrix of the active correctors.
    ///
    /// # Panics
    ///
    /// Panics if any coarse element lacks an active corrector.
    pub fn assemble_ms_stiffness_matrix(&mut self) -> Arc<CscMatrix<f64>> {
        self.assemble_cached(Operator::MsStiffness)
    }

    /// The stiffness matrix of the unperturbed coefficient.
    ///
    /// # Panics
    ///
    /// Panics if any coarse element lacks an active corrector.
    pub fn assemble_stiffness_matrix(&mut self) -> Arc<CscMatrix<f64>> {
        self.assemble_cached(Operator::Stiffness)
    }

    /// The right-hand-side transfer matrix of the active right-hand-side correctors.
    ///
    /// # Panics
    ///
    /// Panics if the right-hand-side correctors have not been computed or were cleared.
    pub fn assemble_ms_rhs_matrix(&mut self) -> Arc<CscMatrix<f64>> {
        self.assemble_cached(Operator::MsRhs)
    }

    /// The fine-by-coarse matrix of basis corrections.
    ///
    /// # Panics
    ///
    /// Panics if any coarse element lacks an active corrector, or if any active corrector has
    /// discarded its fine quantities.
    pub fn assemble_basis_correctors(&mut self) -> Arc<CscMatrix<f64>> {
        self.assemble_cached(Operator::BasisCorrectors)
    }

    pub fn is_assembled(&self, operator: Operator) -> bool {
        self.operators.get(operator).is_some()
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.views.is_some()
    }

    pub fn origin_view(&self) -> Option<&CorrectorView> {
        self.views.as_ref().map(|views| &views.origin)
    }

    pub fn testing_view(&self) -> Option<&CorrectorView> {
        self.views.as_ref().map(|views| &views.testing)
    }

    pub fn active_view(&self) -> Option<&CorrectorView> {
        self.views.as_ref().and_then(|views| views.active.as_ref())
    }

    pub fn origin_corrector(&self, element_index: usize) -> Option<&ElementCorrector> {
        self.resolve(self.origin_view()?, element_index)
    }

    pub fn testing_corrector(&self, element_index: usize) -> Option<&ElementCorrector> {
        self.resolve(self.testing_view()?, element_index)
    }

    pub fn active_corrector(&self, element_index: usize) -> Option<&ElementCorrector> {
        self.resolve(self.active_view()?, element_index)
    }

    pub fn rhs_corrector(&self, element_index: usize) -> Option<&ElementCorrector> {
        let active = self.rhs_views.as_ref()?.active.as_ref()?;
        self.resolve(active, element_index)
    }

    /// Freshness of the active corrector of every coarse element.
    ///
    /// `Pending` only exists while an update is dispatching, so committed statuses are `Fresh` or `Stale`.
    pub fn statuses(&self) -> &[CorrectorStatus] {
        &self.statuses
    }

    /// Number of updates since each corrector was last computed.
    pub fn ages(&self) -> Option<&[usize]> {
        self.ages.as_deref()
    }

    /// The stored error indicators, reused by trial updates.
    pub fn error_indicators(&self) -> Option<&[f64]> {
        self.epsilon_list.as_deref()
    }

    /// The last coarse element recomputed in a trial update.
    pub fn current_testing_corrector(&self) -> Option<usize> {
        self.current_testing_corrector
    }

    /// Number of distinct correctors held in storage across all views.
    pub fn num_stored_correctors(&self) -> usize {
        self.arena.len()
    }
}
