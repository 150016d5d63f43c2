/// irtcat-core: adaptive testing engine for ordinal questionnaires.
///
/// Response log → 2PL maximum likelihood theta → next item by maximum Fisher
/// information. No IO, no terminal, no filesystem: the host renders items, collects
/// answers, and feeds them back.
///
/// Items are identified by caller-provided indices. A `Study` (item bank plus
/// administration plan) is validated once and shared read-only between sessions;
/// each `SessionController` owns its own state.
///
/// # Quick start
///
/// ```rust
/// use std::sync::Arc;
/// use irtcat_core::{
///     EstimatorOptions, Item, ItemBank, ItemPhase, SessionController, SessionDesign, Study,
/// };
///
/// let bank = ItemBank::new(vec![
///     Item::new(1, 1.0, 0.0, ItemPhase::Fixed),
///     Item::new(2, 1.2, -0.5, ItemPhase::AdaptivePool),
///     Item::new(3, 1.5, 0.8, ItemPhase::AdaptivePool),
/// ]).unwrap();
/// let design = SessionDesign {
///     fixed_pre: vec![1],
///     adaptive_length: 2,
///     fixed_post: vec![],
///     estimator: EstimatorOptions::default(),
/// };
/// let study = Arc::new(Study::new(bank, design).unwrap());
///
/// let mut session = SessionController::new(study);
/// while let Some(next) = session.next_item().unwrap() {
///     // Show item `next.item`, collect an answer on the 1..=5 scale.
///     session.record_response(next.item, 4).unwrap();
/// }
/// let outcome = session.finish().unwrap();
/// println!("theta = {:.3} (SE {:.3})", outcome.estimate.theta, outcome.estimate.standard_error);
/// ```

pub mod bank;
pub mod constants;
pub mod error;
pub mod estimation;
pub mod irt;
pub mod selection;
pub mod session;
pub mod simulation;
pub mod types;

// Re-export primary public API at crate root.
pub use bank::ItemBank;
pub use error::{CatError, Result};
pub use estimation::{estimate, estimate_with_trace, EstimatorOptions};
pub use selection::{item_information, select_next, test_information};
pub use session::{
    NextItem, SessionController, SessionDesign, SessionOutcome, SessionPhase, SessionState, Study,
};
pub use simulation::{
    replication_seed, simulate_session, summarize, RecoverySummary, SimulatedRespondent,
};
pub use types::{
    AbilityEstimate, EstimationMethod, EstimationTrace, Item, ItemIndex, ItemPhase, IterationStep,
    Response,
};
