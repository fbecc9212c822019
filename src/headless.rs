use std::collections::BTreeMap;

use parking_lot::Mutex;

use crate::dispatcher::EventSink;
use crate::error::{Error, Result};
use crate::types::*;

/// An in-process notification subsystem with nothing on screen.
///
/// Identifiers are allocated monotonically from 1. The `activate`, `dismiss` and `fail` methods
/// play the part of the user or the OS.
#[derive(Debug)]
pub struct HeadlessSubsystem {
	supported: bool,
	inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
	next_id: u64,
	identity: Option<Identity>,
	reject: bool,
	shown: BTreeMap<NotificationId, (NotificationData, EventSink)>,
}

impl HeadlessSubsystem {
	pub const PROPERTIES: Properties = Properties {
		name: "headless",
		vendor: "tsuuchi",
		version: env!("CARGO_PKG_VERSION"),
		capabilities: &["actions", "body", "icon-static", "sound"],
	};

	pub fn new() -> Self {
		HeadlessSubsystem { supported: true, inner: Default::default() }
	}

	pub fn unsupported() -> Self {
		HeadlessSubsystem { supported: false, inner: Default::default() }
	}

	pub fn reject_submissions(&self, reject: bool) {
		self.inner.lock().reject = reject;
	}

	pub fn identity(&self) -> Option<Identity> {
		self.inner.lock().identity.clone()
	}

	pub fn shown(&self) -> Vec<NotificationId> {
		self.inner.lock().shown.keys().copied().collect()
	}

	pub fn content(&self, id: NotificationId) -> Option<NotificationData> {
		self.inner.lock().shown.get(&id).map(|(data, _)| data.clone())
	}

	/// Clicks the body (`None`) or a button. Returns false if `id` is not on screen.
	pub fn activate(&self, id: NotificationId, action: Option<usize>) -> bool {
		self.close(id, |sink| sink.activated(id, action))
	}

	pub fn dismiss(&self, id: NotificationId, reason: DismissReason) -> bool {
		self.close(id, |sink| sink.dismissed(id, reason))
	}

	pub fn fail(&self, id: NotificationId) -> bool {
		self.close(id, |sink| sink.failed(id))
	}

	fn close(&self, id: NotificationId, report: impl FnOnce(&EventSink)) -> bool {
		match self.inner.lock().shown.remove(&id) {
			Some((_, sink)) => {
				report(&sink);
				true
			}
			None => false,
		}
	}
}

impl Default for HeadlessSubsystem {
	fn default() -> Self {
		Self::new()
	}
}

impl Subsystem for HeadlessSubsystem {
	fn properties(&self) -> Properties {
		Self::PROPERTIES
	}

	fn is_supported(&self) -> bool {
		self.supported
	}

	fn initialize(&self, identity: &Identity) -> Result<()> {
		if !self.supported {
			return Err(Error::SystemNotSupported);
		}
		self.inner.lock().identity = Some(identity.clone());
		Ok(())
	}

	fn submit(&self, identity: &Identity, data: &NotificationData, sink: EventSink) -> Result<Submission> {
		let mut inner = self.inner.lock();
		if inner.identity.as_ref() != Some(identity) {
			return Err(Error::NotInitialized);
		}
		if inner.reject {
			return Err(Error::NotDisplayed("rejected by headless subsystem".into()));
		}
		inner.next_id += 1;
		let id = NotificationId::new(inner.next_id).ok_or(Error::NotDisplayed("out of identifiers".into()))?;
		inner.shown.insert(id, (data.clone(), sink));
		Ok(Submission { id, handle: OsHandle(id.get()) })
	}

	fn withdraw(&self, handle: OsHandle) -> Result<()> {
		let id = NotificationId::new(handle.0).ok_or(Error::InvalidParameters("handle"))?;
		if self.dismiss(id, DismissReason::ApplicationHidden) {
			Ok(())
		} else {
			Err(Error::NotDisplayed(format!("notification {} is not on screen", id)))
		}
	}
}
