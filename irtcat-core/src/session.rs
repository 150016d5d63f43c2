/// Session controller.
///
/// Pure computation: the host renders items and collects answers, then feeds each
/// answer back. Phases are positional: `fixed_pre` in order, `adaptive_length`
/// information-selected items, then `fixed_post` in order. There is no early stop on
/// standard error; every session runs until its positions are filled or no item is
/// left to administer.
///
/// A `Study` is shared read-only between sessions via `Arc`. Each controller owns its
/// `SessionState` and is never shared.
use std::sync::Arc;

use tracing::{debug, warn};

use crate::bank::ItemBank;
use crate::constants::MIN_CATEGORY;
use crate::error::{CatError, Result};
use crate::estimation::{estimate, EstimatorOptions};
use crate::selection::select_next;
use crate::types::{AbilityEstimate, ItemIndex, ItemPhase, Response};

/// Where a position sits in the administration sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SessionPhase {
    FixedPre,
    Adaptive,
    FixedPost,
}

/// Administration plan shared by every session of a study.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionDesign {
    /// Administered first, in this order.
    pub fixed_pre: Vec<ItemIndex>,
    /// Number of positions filled by maximum-information selection.
    pub adaptive_length: usize,
    /// Administered last, in this order. Also the fallback when the pool runs dry.
    pub fixed_post: Vec<ItemIndex>,
    pub estimator: EstimatorOptions,
}

impl SessionDesign {
    /// Positions in a session when the adaptive pool is large enough.
    pub fn total_positions(&self) -> usize {
        self.fixed_pre.len() + self.adaptive_length + self.fixed_post.len()
    }

    /// Phase of a 0-based position, `None` past the end.
    pub fn phase_at(&self, position: usize) -> Option<SessionPhase> {
        let adaptive_end = self.fixed_pre.len() + self.adaptive_length;
        if position < self.fixed_pre.len() {
            Some(SessionPhase::FixedPre)
        } else if position < adaptive_end {
            Some(SessionPhase::Adaptive)
        } else if position < self.total_positions() {
            Some(SessionPhase::FixedPost)
        } else {
            None
        }
    }
}

/// Item bank plus administration plan, validated together.
#[derive(Debug, Clone)]
pub struct Study {
    bank: ItemBank,
    design: SessionDesign,
}

impl Study {
    pub fn new(bank: ItemBank, design: SessionDesign) -> Result<Self> {
        design.estimator.validate()?;

        let mut fixed: Vec<ItemIndex> = Vec::with_capacity(design.fixed_pre.len() + design.fixed_post.len());
        for &index in design.fixed_pre.iter().chain(&design.fixed_post) {
            let item = bank.item(index)?;
            if item.phase != ItemPhase::Fixed {
                return Err(CatError::InvalidDesign(format!(
                    "item {index} is in a fixed sequence but belongs to the adaptive pool"
                )));
            }
            if fixed.contains(&index) {
                return Err(CatError::InvalidDesign(format!(
                    "item {index} appears more than once in the fixed sequences"
                )));
            }
            fixed.push(index);
        }

        let pool_size = bank.adaptive_pool().count();
        if pool_size < design.adaptive_length {
            warn!(
                pool_size,
                adaptive_length = design.adaptive_length,
                "adaptive pool smaller than adaptive phase, fixed_post items will fill the gap"
            );
        }

        Ok(Study { bank, design })
    }

    pub fn bank(&self) -> &ItemBank {
        &self.bank
    }

    pub fn design(&self) -> &SessionDesign {
        &self.design
    }
}

/// Per-session record. `administered[i]` is always `responses[i].item_index`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    administered: Vec<ItemIndex>,
    responses: Vec<Response>,
    last_estimate: Option<AbilityEstimate>,
}

impl SessionState {
    pub fn administered(&self) -> &[ItemIndex] {
        &self.administered
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }

    /// Estimate computed for the most recent adaptive selection.
    pub fn last_estimate(&self) -> Option<&AbilityEstimate> {
        self.last_estimate.as_ref()
    }

    pub fn len(&self) -> usize {
        self.administered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.administered.is_empty()
    }

    fn contains(&self, index: ItemIndex) -> bool {
        self.administered.contains(&index)
    }

    fn push(&mut self, response: Response) {
        self.administered.push(response.item_index);
        self.responses.push(response);
    }
}

/// The item to show next.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NextItem {
    pub item: ItemIndex,
    /// 1-based position in the session.
    pub position: usize,
    pub phase: SessionPhase,
}

/// What a finished session hands to reporting and export.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionOutcome {
    /// Recomputed over the complete response log.
    pub estimate: AbilityEstimate,
    pub administered: Vec<ItemIndex>,
    pub responses: Vec<Response>,
}

pub struct SessionController {
    study: Arc<Study>,
    state: SessionState,
    pending: Option<NextItem>,
}

impl SessionController {
    pub fn new(study: Arc<Study>) -> Self {
        SessionController {
            study,
            state: SessionState::default(),
            pending: None,
        }
    }

    pub fn study(&self) -> &Study {
        &self.study
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The item awaiting a response, if `next_item()` has chosen one.
    pub fn pending(&self) -> Option<NextItem> {
        self.pending
    }

    /// Choose the item for the next position. Repeated calls return the same item
    /// until it is answered. `None` once the session is complete.
    pub fn next_item(&mut self) -> Result<Option<NextItem>> {
        if let Some(pending) = self.pending {
            return Ok(Some(pending));
        }

        let position = self.state.len();
        let study = Arc::clone(&self.study);
        let design = study.design();
        let Some(phase) = design.phase_at(position) else {
            return Ok(None);
        };

        let item = match phase {
            SessionPhase::FixedPre => Some(design.fixed_pre[position]),
            SessionPhase::Adaptive => self.select_adaptive()?,
            SessionPhase::FixedPost => self.next_fixed_post(),
        };

        let next = item.map(|item| NextItem { item, position: position + 1, phase });
        if let Some(next) = next {
            debug!(position = next.position, item = next.item, phase = ?phase, "next item");
        } else {
            debug!(administered = position, "no items left, session complete");
        }
        self.pending = next;
        Ok(next)
    }

    /// Record the answer to the pending item.
    pub fn record_response(&mut self, item: ItemIndex, category: u8) -> Result<()> {
        let Some(pending) = self.pending else {
            if self.is_complete() {
                return Err(CatError::SessionComplete(self.state.len()));
            }
            return Err(CatError::NotPending { expected: None, got: item });
        };
        if pending.item != item {
            return Err(CatError::NotPending { expected: Some(pending.item), got: item });
        }

        let max_category = self.study.design().estimator.max_category;
        if !(MIN_CATEGORY..=max_category).contains(&category) {
            return Err(CatError::CategoryOutOfRange { item, category, max_category });
        }

        self.state.push(Response::new(item, category));
        self.pending = None;
        Ok(())
    }

    /// True when every position is filled, or nothing is left to administer.
    pub fn is_complete(&self) -> bool {
        if self.pending.is_some() {
            return false;
        }
        match self.study.design().phase_at(self.state.len()) {
            None => true,
            Some(SessionPhase::FixedPre) => false,
            Some(SessionPhase::Adaptive) => {
                self.remaining_pool().is_empty() && self.next_fixed_post().is_none()
            }
            Some(SessionPhase::FixedPost) => self.next_fixed_post().is_none(),
        }
    }

    /// Final estimate over the full log. Only valid once the session is complete.
    pub fn finish(self) -> Result<SessionOutcome> {
        if !self.is_complete() {
            return Err(CatError::SessionIncomplete {
                administered: self.state.len(),
                total: self.study.design().total_positions(),
            });
        }

        let estimate = estimate(
            self.study.bank(),
            &self.state.responses,
            &self.study.design().estimator,
        )?;
        debug!(theta = estimate.theta, se = estimate.standard_error, converged = estimate.converged, "session finished");

        Ok(SessionOutcome {
            estimate,
            administered: self.state.administered,
            responses: self.state.responses,
        })
    }

    fn select_adaptive(&mut self) -> Result<Option<ItemIndex>> {
        let study = Arc::clone(&self.study);
        let current = estimate(study.bank(), &self.state.responses, &study.design().estimator)?;
        self.state.last_estimate = Some(current);

        let candidates = self.remaining_pool();
        match select_next(study.bank(), &current, &candidates) {
            Some(item) => Ok(Some(item)),
            None => {
                warn!(
                    administered = self.state.len(),
                    "adaptive pool exhausted, falling through to fixed_post order"
                );
                Ok(self.next_fixed_post())
            }
        }
    }

    /// Adaptive-pool items not yet administered, ascending.
    fn remaining_pool(&self) -> Vec<ItemIndex> {
        self.study
            .bank()
            .adaptive_pool()
            .filter(|&index| !self.state.contains(index))
            .collect()
    }

    /// First `fixed_post` item not yet administered.
    fn next_fixed_post(&self) -> Option<ItemIndex> {
        self.study
            .design()
            .fixed_post
            .iter()
            .copied()
            .find(|&index| !self.state.contains(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;

    fn fixed(index: ItemIndex) -> Item {
        Item::new(index, 1.0, 0.0, ItemPhase::Fixed)
    }

    fn adaptive(index: ItemIndex, a: f64, b: f64) -> Item {
        Item::new(index, a, b, ItemPhase::AdaptivePool)
    }

    fn study(items: Vec<Item>, pre: &[ItemIndex], adaptive_length: usize, post: &[ItemIndex]) -> Arc<Study> {
        let design = SessionDesign {
            fixed_pre: pre.to_vec(),
            adaptive_length,
            fixed_post: post.to_vec(),
            estimator: EstimatorOptions::default(),
        };
        Arc::new(Study::new(ItemBank::new(items).unwrap(), design).unwrap())
    }

    /// Five fixed, eight adaptive, five fixed: the deployed shape.
    fn standard_study() -> Arc<Study> {
        let mut items: Vec<Item> = (1..=5).chain(16..=20).map(fixed).collect();
        for (k, index) in (6..=13).enumerate() {
            items.push(adaptive(index, 0.8 + 0.1 * k as f64, -2.0 + 0.5 * k as f64));
        }
        study(items, &[1, 2, 3, 4, 5], 5, &[16, 17, 18, 19, 20])
    }

    fn run_to_end(controller: &mut SessionController, category: u8) -> Vec<NextItem> {
        let mut shown = Vec::new();
        while let Some(next) = controller.next_item().unwrap() {
            controller.record_response(next.item, category).unwrap();
            shown.push(next);
        }
        shown
    }

    #[test]
    fn test_phase_boundaries() {
        let study = standard_study();
        let design = study.design();
        assert_eq!(design.total_positions(), 15);
        assert_eq!(design.phase_at(0), Some(SessionPhase::FixedPre));
        assert_eq!(design.phase_at(4), Some(SessionPhase::FixedPre));
        assert_eq!(design.phase_at(5), Some(SessionPhase::Adaptive));
        assert_eq!(design.phase_at(9), Some(SessionPhase::Adaptive));
        assert_eq!(design.phase_at(10), Some(SessionPhase::FixedPost));
        assert_eq!(design.phase_at(14), Some(SessionPhase::FixedPost));
        assert_eq!(design.phase_at(15), None);
    }

    #[test]
    fn test_full_session_order_and_no_repeats() {
        let mut controller = SessionController::new(standard_study());
        let shown = run_to_end(&mut controller, 3);

        assert_eq!(shown.len(), 15);
        let items: Vec<ItemIndex> = shown.iter().map(|n| n.item).collect();
        assert_eq!(&items[..5], &[1, 2, 3, 4, 5]);
        assert_eq!(&items[10..], &[16, 17, 18, 19, 20]);
        assert!(items[5..10].iter().all(|i| (6..=13).contains(i)));

        let mut unique = items.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), items.len());

        assert!(controller.is_complete());
        assert_eq!(controller.state().administered(), items.as_slice());
        let outcome = controller.finish().unwrap();
        assert_eq!(outcome.administered.len(), outcome.responses.len());
        assert!(outcome.estimate.theta.is_finite());
    }

    #[test]
    fn test_next_item_is_stable_until_answered() {
        let mut controller = SessionController::new(standard_study());
        let first = controller.next_item().unwrap();
        assert_eq!(controller.next_item().unwrap(), first);
        assert_eq!(controller.pending(), first);
    }

    #[test]
    fn test_adaptive_phase_follows_estimate() {
        let items = vec![
            fixed(1),
            fixed(2),
            fixed(3),
            adaptive(10, 1.0, -2.0),
            adaptive(11, 1.0, 0.0),
            adaptive(12, 1.0, 2.5),
        ];
        let study = study(items, &[1, 2, 3], 1, &[]);

        let mut controller = SessionController::new(Arc::clone(&study));
        for _ in 0..3 {
            let next = controller.next_item().unwrap().unwrap();
            controller.record_response(next.item, 5).unwrap();
        }
        let next = controller.next_item().unwrap().unwrap();
        assert_eq!(next.phase, SessionPhase::Adaptive);
        assert_eq!(next.item, 12);
        assert!(controller.state().last_estimate().unwrap().theta > 2.0);

        let mut controller = SessionController::new(study);
        for _ in 0..3 {
            let next = controller.next_item().unwrap().unwrap();
            controller.record_response(next.item, 1).unwrap();
        }
        assert_eq!(controller.next_item().unwrap().unwrap().item, 10);
    }

    #[test]
    fn test_exhausted_pool_falls_through_to_fixed_post() {
        let items = vec![
            fixed(1),
            fixed(2),
            adaptive(10, 1.0, 0.0),
            adaptive(11, 1.2, 0.5),
            fixed(20),
            fixed(21),
            fixed(22),
            fixed(23),
        ];
        let mut controller = SessionController::new(study(items, &[1, 2], 4, &[20, 21, 22, 23]));
        let shown = run_to_end(&mut controller, 4);

        let items: Vec<ItemIndex> = shown.iter().map(|n| n.item).collect();
        assert_eq!(items.len(), 8);
        assert_eq!(&items[..2], &[1, 2]);
        let mut pool_part = items[2..4].to_vec();
        pool_part.sort_unstable();
        assert_eq!(pool_part, vec![10, 11]);
        // Adaptive positions 5 and 6 borrow from fixed_post, then fixed_post continues.
        assert_eq!(&items[4..], &[20, 21, 22, 23]);
        assert_eq!(shown[4].phase, SessionPhase::Adaptive);
        assert_eq!(shown[6].phase, SessionPhase::FixedPost);

        assert!(controller.is_complete());
        assert!(controller.finish().is_ok());
    }

    #[test]
    fn test_empty_pool_goes_straight_to_fixed_post() {
        let items = vec![fixed(1), fixed(2), fixed(3)];
        let mut controller = SessionController::new(study(items, &[1], 5, &[2, 3]));
        let shown = run_to_end(&mut controller, 2);
        let items: Vec<ItemIndex> = shown.iter().map(|n| n.item).collect();
        assert_eq!(items, vec![1, 2, 3]);
        assert!(controller.is_complete());
    }

    #[test]
    fn test_rejects_wrong_item_and_bad_category() {
        let mut controller = SessionController::new(standard_study());
        assert_eq!(
            controller.record_response(1, 3).unwrap_err(),
            CatError::NotPending { expected: None, got: 1 }
        );

        let next = controller.next_item().unwrap().unwrap();
        assert_eq!(
            controller.record_response(99, 3).unwrap_err(),
            CatError::NotPending { expected: Some(next.item), got: 99 }
        );
        assert!(matches!(
            controller.record_response(next.item, 6).unwrap_err(),
            CatError::CategoryOutOfRange { category: 6, .. }
        ));
        assert!(controller.state().is_empty());

        controller.record_response(next.item, 5).unwrap();
        assert_eq!(controller.state().len(), 1);
    }

    #[test]
    fn test_finish_requires_complete_session() {
        let mut controller = SessionController::new(standard_study());
        let next = controller.next_item().unwrap().unwrap();
        controller.record_response(next.item, 3).unwrap();
        assert_eq!(
            controller.finish().unwrap_err(),
            CatError::SessionIncomplete { administered: 1, total: 15 }
        );
    }

    #[test]
    fn test_record_after_complete_errors() {
        let items = vec![fixed(1)];
        let mut controller = SessionController::new(study(items, &[1], 0, &[]));
        run_to_end(&mut controller, 3);
        assert_eq!(controller.record_response(1, 3).unwrap_err(), CatError::SessionComplete(1));
    }

    #[test]
    fn test_study_rejects_pool_item_in_fixed_sequence() {
        let bank = ItemBank::new(vec![fixed(1), adaptive(2, 1.0, 0.0)]).unwrap();
        let design = SessionDesign {
            fixed_pre: vec![1, 2],
            adaptive_length: 0,
            fixed_post: vec![],
            estimator: EstimatorOptions::default(),
        };
        assert!(matches!(Study::new(bank, design).unwrap_err(), CatError::InvalidDesign(_)));
    }

    #[test]
    fn test_study_rejects_repeated_and_unknown_fixed_items() {
        let bank = ItemBank::new(vec![fixed(1), fixed(2)]).unwrap();
        let design = SessionDesign {
            fixed_pre: vec![1],
            adaptive_length: 0,
            fixed_post: vec![2, 1],
            estimator: EstimatorOptions::default(),
        };
        assert!(matches!(Study::new(bank.clone(), design).unwrap_err(), CatError::InvalidDesign(_)));

        let design = SessionDesign {
            fixed_pre: vec![3],
            adaptive_length: 0,
            fixed_post: vec![],
            estimator: EstimatorOptions::default(),
        };
        assert_eq!(Study::new(bank, design).unwrap_err(), CatError::UnknownItem(3));
    }
}
