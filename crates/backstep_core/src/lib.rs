//! Advances systems of ODEs by one implicit (backward) Euler step, solving the
//! induced nonlinear system with Newton's method.
//!
//! Key components:
//! - **Traits**: `OdeSystem` (right-hand side f(t, u)) and `LinearSolver` (dense solve backend).
//! - **Jacobian**: forward-difference Newton iteration matrix I − dt·∂f/∂u.
//! - **Newton**: `advance`, the single-step entry point, and the `ImplicitEuler` wrapper.
//! - **Systems**: reference problems (linear decay, time-scaled decay, Brusselator).

pub mod error;
pub mod jacobian;
pub mod linear;
pub mod newton;
pub mod params;
pub mod systems;
pub mod traits;

pub use error::{SingularMatrix, Stage, StepError};
pub use linear::LuSolver;
pub use newton::{advance, ImplicitEuler, NewtonSettings, StepReport};
pub use params::ProblemParameters;
pub use traits::{LinearSolver, OdeSystem};
