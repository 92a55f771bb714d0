//! Ordered collection engine.
//!
//! Board columns, board tasks, and roadmap quarters/milestones/categories/rows
//! all carry a dense, zero-based `order` index: after every mutation the
//! sibling orders form exactly `0..n` with no gaps or duplicates. All shift
//! arithmetic lives here so each aggregate manager delegates instead of
//! reimplementing it.

use crate::error::{Error, Result};

/// An item that participates in a dense order sequence.
pub trait Ordered {
    fn item_id(&self) -> &str;
    fn order(&self) -> usize;
    fn set_order(&mut self, order: usize);
}

fn position_of<T: Ordered>(items: &[T], id: &str) -> Option<usize> {
    items.iter().position(|item| item.item_id() == id)
}

/// Append `item` with `order = items.len()`.
///
/// Fails with `CapacityExceeded` when the sequence is already at `max`.
pub fn insert_at_end<T: Ordered>(
    items: &mut Vec<T>,
    mut item: T,
    max: usize,
    what: &'static str,
) -> Result<()> {
    if items.len() >= max {
        return Err(Error::CapacityExceeded { what, max });
    }
    item.set_order(items.len());
    items.push(item);
    Ok(())
}

/// Move the item with `id` to `new_order`, shifting the items between the
/// old and new position by one toward the vacated slot.
pub fn reorder<T: Ordered>(items: &mut [T], id: &str, new_order: usize) -> Result<()> {
    if new_order >= items.len() {
        return Err(Error::InvalidOrder {
            requested: new_order,
            len: items.len(),
        });
    }
    let moved = position_of(items, id)
        .ok_or_else(|| Error::NotFound(format!("item not found: {id}")))?;
    let old_order = items[moved].order();

    if new_order == old_order {
        return Ok(());
    }

    for (index, item) in items.iter_mut().enumerate() {
        if index == moved {
            continue;
        }
        let order = item.order();
        if new_order < old_order && order >= new_order && order < old_order {
            item.set_order(order + 1);
        } else if new_order > old_order && order > old_order && order <= new_order {
            item.set_order(order - 1);
        }
    }
    items[moved].set_order(new_order);
    Ok(())
}

/// Move the item with `id` from `source` to `dest` at `dest_order`
/// (appending when `dest_order` is `None`).
///
/// The gap left in `source` is closed and `dest` siblings at or past the
/// insertion point shift up by one.
pub fn move_between<T: Ordered>(
    source: &mut Vec<T>,
    dest: &mut Vec<T>,
    id: &str,
    dest_order: Option<usize>,
    max: usize,
    what: &'static str,
) -> Result<()> {
    if dest.len() >= max {
        return Err(Error::CapacityExceeded { what, max });
    }
    let dest_order = dest_order.unwrap_or(dest.len());
    if dest_order > dest.len() {
        return Err(Error::InvalidOrder {
            requested: dest_order,
            len: dest.len(),
        });
    }

    let mut item = remove(source, id)?;

    for existing in dest.iter_mut() {
        let order = existing.order();
        if order >= dest_order {
            existing.set_order(order + 1);
        }
    }
    item.set_order(dest_order);
    dest.push(item);
    Ok(())
}

/// Remove the item with `id`, closing the gap in the remaining orders.
pub fn remove<T: Ordered>(items: &mut Vec<T>, id: &str) -> Result<T> {
    let position = position_of(items, id)
        .ok_or_else(|| Error::NotFound(format!("item not found: {id}")))?;
    let removed = items.remove(position);
    let removed_order = removed.order();
    for item in items.iter_mut() {
        let order = item.order();
        if order > removed_order {
            item.set_order(order - 1);
        }
    }
    Ok(removed)
}

/// True when the orders form exactly `0..items.len()`.
pub fn is_dense<T: Ordered>(items: &[T]) -> bool {
    let mut orders: Vec<usize> = items.iter().map(Ordered::order).collect();
    orders.sort_unstable();
    orders.iter().enumerate().all(|(index, order)| index == *order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        order: usize,
    }

    impl Item {
        fn new(id: &str, order: usize) -> Self {
            Self {
                id: id.to_string(),
                order,
            }
        }
    }

    impl Ordered for Item {
        fn item_id(&self) -> &str {
            &self.id
        }

        fn order(&self) -> usize {
            self.order
        }

        fn set_order(&mut self, order: usize) {
            self.order = order;
        }
    }

    fn items(n: usize) -> Vec<Item> {
        (0..n).map(|i| Item::new(&format!("item-{i}"), i)).collect()
    }

    fn order_of(items: &[Item], id: &str) -> usize {
        items.iter().find(|item| item.id == id).unwrap().order
    }

    #[test]
    fn insert_at_end_assigns_next_order() {
        let mut list = items(2);
        insert_at_end(&mut list, Item::new("item-2", 0), 5, "items").unwrap();
        assert_eq!(order_of(&list, "item-2"), 2);
        assert!(is_dense(&list));
    }

    #[test]
    fn insert_at_capacity_fails_and_under_capacity_succeeds() {
        let mut list = items(4);
        insert_at_end(&mut list, Item::new("item-4", 0), 5, "items").unwrap();
        let err = insert_at_end(&mut list, Item::new("item-5", 0), 5, "items").unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { max: 5, .. }));
        assert_eq!(list.len(), 5);
    }

    #[test]
    fn reorder_down_shifts_intervening_up() {
        // Spec scenario: order 3 -> 1 in a 5 item list.
        let mut list = items(5);
        reorder(&mut list, "item-3", 1).unwrap();
        assert_eq!(order_of(&list, "item-0"), 0);
        assert_eq!(order_of(&list, "item-1"), 2);
        assert_eq!(order_of(&list, "item-2"), 3);
        assert_eq!(order_of(&list, "item-3"), 1);
        assert_eq!(order_of(&list, "item-4"), 4);
        assert!(is_dense(&list));
    }

    #[test]
    fn reorder_up_shifts_intervening_down() {
        let mut list = items(5);
        reorder(&mut list, "item-1", 3).unwrap();
        assert_eq!(order_of(&list, "item-1"), 3);
        assert_eq!(order_of(&list, "item-2"), 1);
        assert_eq!(order_of(&list, "item-3"), 2);
        assert_eq!(order_of(&list, "item-0"), 0);
        assert_eq!(order_of(&list, "item-4"), 4);
        assert!(is_dense(&list));
    }

    #[test]
    fn reorder_to_same_position_is_noop() {
        let mut list = items(3);
        let before = list.clone();
        reorder(&mut list, "item-1", 1).unwrap();
        assert_eq!(list, before);
    }

    #[test]
    fn reorder_out_of_range_fails() {
        let mut list = items(3);
        let err = reorder(&mut list, "item-0", 3).unwrap_err();
        assert!(matches!(err, Error::InvalidOrder { requested: 3, len: 3 }));
    }

    #[test]
    fn remove_renumbers_the_tail() {
        let mut list = items(4);
        let removed = remove(&mut list, "item-1").unwrap();
        assert_eq!(removed.id, "item-1");
        assert_eq!(order_of(&list, "item-0"), 0);
        assert_eq!(order_of(&list, "item-2"), 1);
        assert_eq!(order_of(&list, "item-3"), 2);
        assert!(is_dense(&list));
    }

    #[test]
    fn move_between_closes_gap_and_shifts_destination() {
        // Spec scenario: source has 3 items, move the one at order 1 to the
        // front of a destination that already has one item.
        let mut source = items(3);
        let mut dest = vec![Item::new("other-0", 0)];
        move_between(&mut source, &mut dest, "item-1", Some(0), 500, "tasks").unwrap();

        assert_eq!(order_of(&source, "item-0"), 0);
        assert_eq!(order_of(&source, "item-2"), 1);
        assert_eq!(order_of(&dest, "item-1"), 0);
        assert_eq!(order_of(&dest, "other-0"), 1);
        assert!(is_dense(&source));
        assert!(is_dense(&dest));
    }

    #[test]
    fn move_between_defaults_to_end() {
        let mut source = items(2);
        let mut dest = items(2);
        move_between(&mut source, &mut dest, "item-0", None, 500, "tasks").unwrap();
        assert_eq!(dest.len(), 3);
        assert_eq!(dest.last().unwrap().order, 2);
        assert!(is_dense(&dest));
    }

    #[test]
    fn move_between_preserves_total_count() {
        let mut source = items(5);
        let mut dest = items(3);
        let total = source.len() + dest.len();
        move_between(&mut source, &mut dest, "item-2", Some(1), 500, "tasks").unwrap();
        assert_eq!(source.len() + dest.len(), total);
    }

    #[test]
    fn move_between_full_destination_fails() {
        let mut source = items(2);
        let mut dest = items(3);
        let err =
            move_between(&mut source, &mut dest, "item-0", None, 3, "tasks").unwrap_err();
        assert!(matches!(err, Error::CapacityExceeded { max: 3, .. }));
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn move_between_rejects_order_past_end() {
        let mut source = items(2);
        let mut dest = items(1);
        let err =
            move_between(&mut source, &mut dest, "item-0", Some(2), 500, "tasks").unwrap_err();
        assert!(matches!(err, Error::InvalidOrder { requested: 2, len: 1 }));
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn density_holds_across_random_mutation_sequence() {
        let mut list: Vec<Item> = Vec::new();
        for i in 0..12 {
            insert_at_end(&mut list, Item::new(&format!("item-{i}"), 0), 20, "items").unwrap();
        }
        reorder(&mut list, "item-11", 0).unwrap();
        reorder(&mut list, "item-0", 5).unwrap();
        remove(&mut list, "item-6").unwrap();
        remove(&mut list, "item-11").unwrap();
        reorder(&mut list, "item-3", 9).unwrap();
        assert_eq!(list.len(), 10);
        assert!(is_dense(&list));
    }
}
