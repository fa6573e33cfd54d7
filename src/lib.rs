//! Assembly of structured Lagrange finite element patches embedded in parametric surfaces.
//!
//! A [`LagrangePatch`](patch::LagrangePatch) turns a [`ParametricSurface`](surface::ParametricSurface)
//! into nodes, coordinates and element connectivity, integrates user-supplied
//! [`Integrand`](integrand::Integrand)s over its elements and boundary edges into a
//! [`GlobalIntegral`](assembly::GlobalIntegral), and evaluates nodal fields for
//! post-processing.

pub mod assembly;
pub mod basis;
pub mod error;
pub mod grid;
pub mod integrand;
pub mod io;
pub mod mapping;
pub mod options;
pub mod patch;
pub mod quadrature;
pub mod surface;
pub mod threading;

pub extern crate lagpatch_nested_vec as nested_vec;
pub extern crate lagpatch_paradis as paradis;
pub extern crate nalgebra;
pub extern crate vtkio;

pub use error::PatchError;
pub use options::PatchOptions;
