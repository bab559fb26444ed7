//! Shuffle order generation
//!
//! The shuffled order is a projection over the collection; the collection
//! itself is never reordered.

use hub_core::TrackId;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};

/// Build a fresh permutation of `tracks`
///
/// When `anchor` is in the list it is placed first and the rest are shuffled
/// behind it, so turning shuffle on never moves playback away from the
/// current track and every other track is still ahead of it.
pub fn shuffled_order(tracks: &[TrackId], anchor: Option<&TrackId>) -> Vec<TrackId> {
    let mut rng = thread_rng();

    let mut rest: Vec<TrackId> = tracks
        .iter()
        .filter(|id| Some(*id) != anchor)
        .cloned()
        .collect();
    rest.shuffle(&mut rng);

    match anchor {
        Some(anchor) if tracks.contains(anchor) => {
            let mut order = Vec::with_capacity(tracks.len());
            order.push(anchor.clone());
            order.extend(rest);
            order
        }
        _ => rest,
    }
}

/// Insert `id` at a random position after `after`'s slot in `order`
///
/// With no anchor (or an anchor not in `order`) any position is eligible.
pub fn insert_randomly(order: &mut Vec<TrackId>, id: TrackId, after: Option<&TrackId>) {
    let lower = after
        .and_then(|a| order.iter().position(|t| t == a))
        .map_or(0, |i| i + 1);
    let index = thread_rng().gen_range(lower..=order.len());
    order.insert(index, id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn tracks(n: usize) -> Vec<TrackId> {
        (0..n).map(|i| TrackId::new(format!("/hub/track/{i}"))).collect()
    }

    #[test]
    fn shuffle_preserves_membership() {
        let original = tracks(20);
        let order = shuffled_order(&original, None);

        assert_eq!(order.len(), original.len());
        let a: HashSet<_> = original.iter().collect();
        let b: HashSet<_> = order.iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn anchor_goes_first() {
        let original = tracks(10);
        let anchor = original[6].clone();

        for _ in 0..20 {
            let order = shuffled_order(&original, Some(&anchor));
            assert_eq!(order[0], anchor);
            assert_eq!(order.len(), 10);
        }
    }

    #[test]
    fn unknown_anchor_is_ignored() {
        let original = tracks(4);
        let order = shuffled_order(&original, Some(&TrackId::new("/elsewhere")));
        assert_eq!(order.len(), 4);
    }

    #[test]
    fn random_insert_stays_after_anchor() {
        let base = tracks(5);
        for _ in 0..50 {
            let mut order = base.clone();
            insert_randomly(&mut order, TrackId::new("/new"), Some(&base[2]));
            let pos = order.iter().position(|t| t.as_str() == "/new").unwrap();
            assert!(pos >= 3, "inserted at {pos}");
            assert_eq!(order.len(), 6);
        }
    }

    #[test]
    fn random_insert_into_empty_order() {
        let mut order = Vec::new();
        insert_randomly(&mut order, TrackId::new("/new"), None);
        assert_eq!(order, vec![TrackId::new("/new")]);
    }
}
