//! Numerical building blocks: least squares, simplex minimisation, table interpolation.

pub mod interp;
pub mod ols;
pub mod optim;

pub use interp::*;
pub use ols::*;
pub use optim::*;
