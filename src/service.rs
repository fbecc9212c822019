use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::dispatcher::{EventDispatcher, Handler, HandlerTable};
use crate::error::{Error, Result};
use crate::notification::NotificationDescriptor;
use crate::registry::{LiveNotification, NotificationRegistry};
use crate::types::*;

#[derive(Debug, Default)]
pub(crate) struct State {
	pub(crate) identity: Option<Identity>,
	pub(crate) registry: NotificationRegistry,
	pub(crate) handlers: HandlerTable,
}

/// Submits notifications to the OS subsystem and tracks them until they reach a terminal state.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use tsuuchi::{NotificationService, NotificationDescriptor, FreedesktopSubsystem};
/// let service = NotificationService::new(Arc::new(FreedesktopSubsystem::new()));
/// service.initialize("Portal", "Acme.Portal")?;
/// service.on_activated(|id, button| println!("{id} activated via {button:?}"));
///
/// let mut n = NotificationDescriptor::new("Connection blocked", "example.com tried to connect")?;
/// n.add_button("Allow")?;
/// let id = service.show(n)?;
/// service.hide(id)?;
/// # Ok::<(), tsuuchi::Error>(())
/// ```
pub struct NotificationService {
	subsystem: Arc<dyn Subsystem>,
	state: Arc<Mutex<State>>,
	dispatcher: EventDispatcher,
}

impl NotificationService {
	pub fn new(subsystem: Arc<dyn Subsystem>) -> Self {
		let state = Arc::new(Mutex::new(State::default()));
		let dispatcher = EventDispatcher::spawn(state.clone());
		NotificationService { subsystem, state, dispatcher }
	}

	pub fn initialize(&self, app_name: &str, app_user_model_id: &str) -> Result<()> {
		self.initialize_with(Identity::new(app_name, app_user_model_id)?)
	}

	/// Initializing again with the same identity is a no-op. A different identity is refused
	/// and the first one stays in effect.
	pub fn initialize_with(&self, identity: Identity) -> Result<()> {
		let mut state = self.state.lock();
		if let Some(current) = &state.identity {
			if *current == identity {
				return Ok(());
			}
			log::warn!("already initialized as {}, ignoring {}", current, identity);
			return Err(Error::AlreadyInitialized { current: current.app_user_model_id().to_owned() });
		}
		if !self.subsystem.is_supported() {
			return Err(Error::SystemNotSupported);
		}
		self.subsystem.initialize(&identity)?;
		let props = self.subsystem.properties();
		log::info!("initialized {} notifications for {}", props.name, identity);
		log::debug!("{} {} by {}, capabilities {:?}", props.name, props.version, props.vendor, props.capabilities);
		state.identity = Some(identity);
		Ok(())
	}

	pub fn is_initialized(&self) -> bool {
		self.state.lock().identity.is_some()
	}

	pub fn identity(&self) -> Option<Identity> {
		self.state.lock().identity.clone()
	}

	pub fn properties(&self) -> Properties {
		self.subsystem.properties()
	}

	/// Submits the notification. The descriptor is consumed even when this fails.
	pub fn show(&self, descriptor: NotificationDescriptor) -> Result<NotificationId> {
		let mut data = descriptor.into_data();
		let mut state = self.state.lock();
		let identity = state.identity.clone().ok_or(Error::NotInitialized)?;

		if let Some(path) = &data.image {
			if !path.is_file() {
				log::warn!("image {} not found, showing {:?} without it", path.display(), data.title);
				data.image = None;
			}
		}

		let capabilities = self.subsystem.properties().capabilities;
		if !data.actions.is_empty() && !capabilities.contains(&"actions") {
			log::warn!("{} cannot show buttons, {:?} gets none", self.subsystem.properties().name, data.title);
		}

		let submission = self.subsystem.submit(&identity, &data, self.dispatcher.sink())
			.map_err(|e| {
				log::warn!("failed to show {:?}: {}", data.title, e);
				e
			})?;
		state.registry.insert(LiveNotification { id: submission.id, handle: submission.handle });
		log::debug!("showing {:?} as {}", data.title, submission.id);
		Ok(submission.id)
	}

	/// Withdraws a live notification. The entry is forgotten even if the OS call fails.
	pub fn hide(&self, id: NotificationId) -> Result<()> {
		let mut state = self.state.lock();
		if state.identity.is_none() {
			return Err(Error::NotInitialized);
		}
		let live = state.registry.remove(id).ok_or(Error::UnknownNotification(id))?;
		self.subsystem.withdraw(live.handle).map_err(|e| {
			log::warn!("failed to withdraw {}: {}", id, e);
			e
		})?;
		log::debug!("hid {}", id);
		Ok(())
	}

	/// Withdraws every live notification, returning how many the OS accepted.
	pub fn clear(&self) -> Result<usize> {
		let mut state = self.state.lock();
		if state.identity.is_none() {
			return Err(Error::NotInitialized);
		}
		let mut hidden = 0;
		for live in state.registry.drain() {
			match self.subsystem.withdraw(live.handle) {
				Ok(()) => hidden += 1,
				Err(e) => log::warn!("failed to withdraw {}: {}", live.id, e),
			}
		}
		Ok(hidden)
	}

	pub fn is_live(&self, id: NotificationId) -> bool {
		self.state.lock().registry.contains(id)
	}

	pub fn live(&self) -> Vec<NotificationId> {
		self.state.lock().registry.ids()
	}

	pub fn register_handler(&self, kind: EventKind, handler: Handler) {
		self.dispatcher.register_handler(kind, handler)
	}

	pub fn on_activated(&self, f: impl Fn(NotificationId, Option<usize>) + Send + Sync + 'static) {
		self.register_handler(EventKind::Activated, Arc::new(move |e: &Event| {
			if let Event::Activated { id, action } = *e {
				f(id, action)
			}
		}))
	}

	pub fn on_dismissed(&self, f: impl Fn(NotificationId, DismissReason) + Send + Sync + 'static) {
		self.register_handler(EventKind::Dismissed, Arc::new(move |e: &Event| {
			if let Event::Dismissed { id, reason } = *e {
				f(id, reason)
			}
		}))
	}

	pub fn on_failed(&self, f: impl Fn(NotificationId) + Send + Sync + 'static) {
		self.register_handler(EventKind::Failed, Arc::new(move |e: &Event| f(e.id())))
	}

	pub fn sync(&self) {
		self.dispatcher.sync()
	}
}

impl fmt::Debug for NotificationService {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("NotificationService")
			.field("subsystem", &self.subsystem.properties().name)
			.field("state", &self.state)
			.finish()
	}
}
