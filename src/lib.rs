//! Petrov-Galerkin localized orthogonal decomposition (LOD) for coefficients with defects.
//!
//! The multiscale basis of a coarse finite element space is built from one *element corrector*
//! per coarse element. This crate manages those correctors as the coefficient changes: it decides
//! which correctors are invalidated by a perturbation, recomputes only those through a
//! [`dispatch::PatchComputation`], and assembles the global coarse operators from the result.
//!
//! The numerical solution of the local corrector problems is not part of this crate. It is
//! provided by implementing [`dispatch::PatchComputation`].
pub mod assembly;
pub mod coefficient;
pub mod corrector;
pub mod dispatch;
pub mod grid;
pub mod indicator;
pub mod lod;

pub use lod::{LodSettings, UpdateOptions, UpdateReport, VcPetrovGalerkinLod};

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
