//! Numerical kernels for the subchannel solver: tridiagonal, banded and
//! dense direct solves, CSR assembly, restarted GMRES and Newton–Krylov.

pub mod banded;
pub mod gmres;
pub mod linalg;
pub mod newton;
pub mod sparse;
pub mod system;
pub mod tridiag;
