/// Maximum-information item selection.
///
/// Greedy, one step ahead: the candidate with the largest Fisher information at the
/// current theta is administered next. No exposure control, no content balancing.
/// Ties go to the lowest item index, so selection never depends on candidate order.
use tracing::warn;

use crate::bank::ItemBank;
use crate::irt::fisher_information;
use crate::types::{AbilityEstimate, ItemIndex};

/// Pick the next item from `candidates`. `None` if there is nothing to pick.
///
/// Candidates unknown to the bank are skipped.
pub fn select_next(
    bank: &ItemBank,
    estimate: &AbilityEstimate,
    candidates: &[ItemIndex],
) -> Option<ItemIndex> {
    let mut best: Option<(ItemIndex, f64)> = None;

    for (index, info) in item_information(bank, estimate.theta, candidates) {
        best = match best {
            Some((best_index, best_info))
                if best_info > info || (best_info == info && best_index < index) =>
            {
                Some((best_index, best_info))
            }
            _ => Some((index, info)),
        };
    }

    best.map(|(index, _)| index)
}

/// Fisher information of each known candidate at theta, in candidate order.
pub fn item_information(
    bank: &ItemBank,
    theta: f64,
    candidates: &[ItemIndex],
) -> Vec<(ItemIndex, f64)> {
    candidates
        .iter()
        .filter_map(|&index| match bank.get(index) {
            Some(item) => Some((index, fisher_information(item, theta))),
            None => {
                warn!(item = index, "selection candidate not in item bank, skipping");
                None
            }
        })
        .collect()
}

/// Total information the given items provide at theta. Unknown items contribute nothing.
pub fn test_information(bank: &ItemBank, theta: f64, items: &[ItemIndex]) -> f64 {
    items
        .iter()
        .filter_map(|&index| bank.get(index))
        .map(|item| fisher_information(item, theta))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, ItemPhase};

    fn at(theta: f64) -> AbilityEstimate {
        AbilityEstimate { theta, standard_error: 1.0, converged: true, iterations: 3 }
    }

    fn pool(params: &[(ItemIndex, f64, f64)]) -> ItemBank {
        let items = params
            .iter()
            .map(|&(i, a, b)| Item::new(i, a, b, ItemPhase::AdaptivePool))
            .collect();
        ItemBank::new(items).unwrap()
    }

    #[test]
    fn test_picks_most_informative() {
        let bank = pool(&[(0, 1.0, -2.0), (1, 1.0, 0.1), (2, 1.0, 2.0)]);
        assert_eq!(select_next(&bank, &at(0.0), &[0, 1, 2]), Some(1));
        assert_eq!(select_next(&bank, &at(2.2), &[0, 1, 2]), Some(2));
    }

    #[test]
    fn test_tie_goes_to_lowest_index() {
        // Item 10 is ~0.10 at theta 0; items 11 and 12 are both exactly 0.25.
        let bank = pool(&[(10, 1.0, 2.0), (11, 1.0, 0.0), (12, 1.0, 0.0)]);
        let info = item_information(&bank, 0.0, &[10, 11, 12]);
        assert!((info[0].1 - 0.105).abs() < 0.01);
        assert_eq!(info[1].1, 0.25);
        assert_eq!(info[2].1, 0.25);

        assert_eq!(select_next(&bank, &at(0.0), &[10, 11, 12]), Some(11));
        assert_eq!(select_next(&bank, &at(0.0), &[12, 11, 10]), Some(11));
    }

    #[test]
    fn test_selection_is_deterministic() {
        let bank = pool(&[(0, 1.4, 0.3), (1, 0.9, -0.2), (2, 1.4, 0.3), (3, 2.0, 1.5)]);
        let candidates = [3, 2, 1, 0];
        let first = select_next(&bank, &at(0.4), &candidates);
        for _ in 0..10 {
            assert_eq!(select_next(&bank, &at(0.4), &candidates), first);
        }
    }

    #[test]
    fn test_empty_candidates() {
        let bank = pool(&[(0, 1.0, 0.0)]);
        assert_eq!(select_next(&bank, &at(0.0), &[]), None);
    }

    #[test]
    fn test_unknown_candidates_skipped() {
        let bank = pool(&[(0, 1.0, 0.0)]);
        assert_eq!(select_next(&bank, &at(0.0), &[5, 0, 6]), Some(0));
        assert_eq!(select_next(&bank, &at(0.0), &[5]), None);
    }

    #[test]
    fn test_higher_discrimination_wins_at_shared_difficulty() {
        let bank = pool(&[(0, 0.8, 0.0), (1, 1.6, 0.0)]);
        assert_eq!(select_next(&bank, &at(0.0), &[0, 1]), Some(1));
        let total = test_information(&bank, 0.0, &[0, 1]);
        assert!((total - (0.64 + 2.56) / 4.0).abs() < 1e-9);
    }
}
