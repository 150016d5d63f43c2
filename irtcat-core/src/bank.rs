/// Item parameter store.
///
/// Loaded once per study and shared read-only by every session. Items are addressed
/// by their caller-provided `ItemIndex`; the bank maps those to positions in an
/// index-sorted vector so iteration order is stable.
use std::collections::HashMap;

use crate::error::{CatError, Result};
use crate::types::{Item, ItemIndex, ItemPhase};

#[derive(Debug, Clone)]
pub struct ItemBank {
    items: Vec<Item>,
    index_to_pos: HashMap<ItemIndex, usize>,
}

impl ItemBank {
    /// Build a bank, rejecting duplicate indices and unusable parameters.
    pub fn new(mut items: Vec<Item>) -> Result<Self> {
        items.sort_by_key(|item| item.index);

        let mut index_to_pos = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            validate_parameters(item)?;
            if index_to_pos.insert(item.index, pos).is_some() {
                return Err(CatError::DuplicateItemIndex(item.index));
            }
        }

        Ok(ItemBank { items, index_to_pos })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: ItemIndex) -> Option<&Item> {
        self.index_to_pos.get(&index).map(|&pos| &self.items[pos])
    }

    /// Like `get`, but an unknown index is an error.
    pub fn item(&self, index: ItemIndex) -> Result<&Item> {
        self.get(index).ok_or(CatError::UnknownItem(index))
    }

    pub fn contains(&self, index: ItemIndex) -> bool {
        self.index_to_pos.contains_key(&index)
    }

    /// All items, ascending by index.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Indices of the adaptive pool, ascending.
    pub fn adaptive_pool(&self) -> impl Iterator<Item = ItemIndex> + '_ {
        self.items
            .iter()
            .filter(|item| item.phase == ItemPhase::AdaptivePool)
            .map(|item| item.index)
    }
}

fn validate_parameters(item: &Item) -> Result<()> {
    if !(item.discrimination.is_finite() && item.discrimination > 0.0) {
        return Err(CatError::InvalidItemParameter {
            index: item.index,
            parameter: "discrimination",
            value: item.discrimination,
        });
    }
    if !item.difficulty.is_finite() {
        return Err(CatError::InvalidItemParameter {
            index: item.index,
            parameter: "difficulty",
            value: item.difficulty,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed(index: ItemIndex) -> Item {
        Item::new(index, 1.0, 0.0, ItemPhase::Fixed)
    }

    #[test]
    fn test_items_sorted_by_index() {
        let bank = ItemBank::new(vec![fixed(30), fixed(10), fixed(20)]).unwrap();
        let order: Vec<ItemIndex> = bank.items().iter().map(|i| i.index).collect();
        assert_eq!(order, vec![10, 20, 30]);
        assert_eq!(bank.get(20).unwrap().index, 20);
        assert!(bank.get(25).is_none());
    }

    #[test]
    fn test_rejects_duplicate_index() {
        let err = ItemBank::new(vec![fixed(1), fixed(2), fixed(1)]).unwrap_err();
        assert_eq!(err, CatError::DuplicateItemIndex(1));
    }

    #[test]
    fn test_rejects_non_positive_discrimination() {
        let err = ItemBank::new(vec![Item::new(4, 0.0, 0.0, ItemPhase::Fixed)]).unwrap_err();
        assert!(matches!(
            err,
            CatError::InvalidItemParameter { index: 4, parameter: "discrimination", .. }
        ));
    }

    #[test]
    fn test_rejects_nan_difficulty() {
        let err = ItemBank::new(vec![Item::new(2, 1.0, f64::NAN, ItemPhase::Fixed)]).unwrap_err();
        assert!(matches!(err, CatError::InvalidItemParameter { parameter: "difficulty", .. }));
    }

    #[test]
    fn test_adaptive_pool_filters_by_phase() {
        let bank = ItemBank::new(vec![
            fixed(1),
            Item::new(3, 1.1, 0.2, ItemPhase::AdaptivePool),
            Item::new(2, 0.9, -0.3, ItemPhase::AdaptivePool),
        ])
        .unwrap();
        let pool: Vec<ItemIndex> = bank.adaptive_pool().collect();
        assert_eq!(pool, vec![2, 3]);
    }

    #[test]
    fn test_unknown_item_error() {
        let bank = ItemBank::new(vec![fixed(1)]).unwrap();
        assert_eq!(bank.item(9).unwrap_err(), CatError::UnknownItem(9));
    }
}
