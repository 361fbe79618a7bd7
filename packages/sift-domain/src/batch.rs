//! Batch resolution of one-to-many child rows down to one row per parent key.

use std::{cmp::Ordering, collections::HashMap, hash::Hash};

/// Keeps, for every key, the item that ranks highest under `rank`.
///
/// `rank` must be a total order in which no two distinct items compare equal, otherwise the
/// survivor would depend on input order.
pub fn best_by_key<T, K, KF, RF>(items: impl IntoIterator<Item = T>, key: KF, rank: RF) -> HashMap<K, T>
where
	K: Eq + Hash,
	KF: Fn(&T) -> K,
	RF: Fn(&T, &T) -> Ordering,
{
	let mut best: HashMap<K, T> = HashMap::new();

	for item in items {
		match best.get_mut(&key(&item)) {
			Some(current) =>
				if rank(&item, current) == Ordering::Greater {
					*current = item;
				},
			None => {
				best.insert(key(&item), item);
			},
		}
	}

	best
}
