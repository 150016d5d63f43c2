/// Lowest response category on every scale.
pub const MIN_CATEGORY: u8 = 1;

/// Highest response category on the five-point scale used by the questionnaires.
pub const DEFAULT_MAX_CATEGORY: u8 = 5;

/// Starting point for Newton-Raphson. The latent scale is standardized, so 0.0 is the
/// population mean.
pub const INITIAL_THETA: f64 = 0.0;

/// Upper bound on Newton-Raphson iterations per estimate.
///
/// Converged cases on realistic banks settle in 3-6 iterations; 20 leaves room for
/// slow approaches toward a theta bound without ever looping unboundedly.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// An iteration whose applied step is smaller than this counts as converged.
pub const CONVERGENCE_TOLERANCE: f64 = 0.001;

/// Curvature magnitudes at or below this are treated as degenerate: the step would
/// be dominated by noise, so theta is left where it is.
pub const CURVATURE_EPSILON: f64 = 0.01;

/// Response probabilities are clamped to `[PROBABILITY_FLOOR, 1 - PROBABILITY_FLOOR]`.
/// Keeps information strictly positive for any finite theta.
pub const PROBABILITY_FLOOR: f64 = 1e-6;

/// Default clamp for theta estimates. Realistic parameters and five-point responses
/// keep the MLE inside this range; all-extreme response patterns are pinned to it.
pub const DEFAULT_THETA_BOUNDS: (f64, f64) = (-4.0, 4.0);

/// Below this many responses the MLE is not attempted.
pub const MIN_RESPONSES_FOR_MLE: usize = 3;

/// Standard error reported with the classical fallback estimate.
pub const FALLBACK_STANDARD_ERROR: f64 = 1.0;

/// Maps the centered mean of normalized responses (`-0.5..=0.5`) onto the theta scale.
/// 4.0 spreads the fallback over `[-2, 2]`.
pub const DEFAULT_FALLBACK_SCALE: f64 = 4.0;

/// Fixed items administered before the adaptive phase in the deployed questionnaires.
pub const DEFAULT_FIXED_PRE_LENGTH: usize = 5;

/// Adaptive positions in the deployed questionnaires.
pub const DEFAULT_ADAPTIVE_LENGTH: usize = 5;
