use std::collections::BTreeMap;

use crate::types::{NotificationId, OsHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveNotification {
	pub id: NotificationId,
	pub handle: OsHandle,
}

#[derive(Debug, Default)]
pub struct NotificationRegistry {
	live: BTreeMap<NotificationId, LiveNotification>,
}

impl NotificationRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the entry it displaced, which only happens if the OS reused an identifier.
	pub fn insert(&mut self, live: LiveNotification) -> Option<LiveNotification> {
		let prev = self.live.insert(live.id, live);
		if prev.is_some() {
			log::warn!("notification id {} was issued twice", live.id);
		}
		prev
	}

	pub fn get(&self, id: NotificationId) -> Option<&LiveNotification> {
		self.live.get(&id)
	}

	pub fn contains(&self, id: NotificationId) -> bool {
		self.live.contains_key(&id)
	}

	pub fn remove(&mut self, id: NotificationId) -> Option<LiveNotification> {
		self.live.remove(&id)
	}

	pub fn drain(&mut self) -> Vec<LiveNotification> {
		std::mem::take(&mut self.live).into_values().collect()
	}

	pub fn ids(&self) -> Vec<NotificationId> {
		self.live.keys().copied().collect()
	}

	pub fn len(&self) -> usize {
		self.live.len()
	}

	pub fn is_empty(&self) -> bool {
		self.live.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn id(n: u32) -> NotificationId {
		NotificationId::from(n)
	}

	fn live(n: u32) -> LiveNotification {
		LiveNotification { id: id(n), handle: OsHandle(n.into()) }
	}

	#[test]
	fn stale_lookups_are_harmless() {
		let mut reg = NotificationRegistry::new();
		reg.insert(live(1));
		assert!(reg.remove(id(2)).is_none());
		assert_eq!(reg.len(), 1);
		assert_eq!(reg.remove(id(1)), Some(live(1)));
		assert!(reg.remove(id(1)).is_none());
		assert!(reg.is_empty());
	}

	#[test]
	fn drain_empties_in_id_order() {
		let mut reg = NotificationRegistry::new();
		for n in [5, 2, 9] {
			reg.insert(live(n));
		}
		assert_eq!(reg.ids(), [id(2), id(5), id(9)]);
		assert_eq!(reg.drain(), [live(2), live(5), live(9)]);
		assert!(reg.get(id(5)).is_none());
	}
}
