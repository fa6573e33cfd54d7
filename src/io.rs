//! Mesh input and output.
pub mod lagrange;
pub mod vtk;
