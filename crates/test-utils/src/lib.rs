//! Test support for the workspace.
//!
//! Integration tests need real NetCDF input. [`WrfoutSpec`] writes a
//! small wrfout file whose every field follows a closed-form expression,
//! so tests can assert decoded values against the same formula instead
//! of carrying golden files around.

pub mod paths;
pub mod wrfout;

pub use paths::{scratch_dir, scratch_wrfout};
pub use wrfout::WrfoutSpec;

/// Assert two floats agree within an absolute tolerance.
///
/// The two-argument form uses a tolerance of `1e-6`.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr) => {
        $crate::assert_approx_eq!($left, $right, 1e-6);
    };
    ($left:expr, $right:expr, $eps:expr) => {{
        let (left, right) = (($left) as f64, ($right) as f64);
        assert!(
            (left - right).abs() <= $eps,
            "values differ by more than {}: left = {}, right = {}",
            $eps,
            left,
            right,
        );
    }};
}
