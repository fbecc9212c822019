use std::{cell::Cell, fmt, panic::AssertUnwindSafe, sync::{Arc, Weak}};

use parking_lot::Mutex;

use crate::service::State;
use crate::types::*;

pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default, Clone)]
pub struct HandlerTable {
	slots: [Option<Handler>; 3],
}

impl HandlerTable {
	/// Returns the handler that was replaced.
	pub fn register(&mut self, kind: EventKind, handler: Handler) -> Option<Handler> {
		self.slots[kind.index()].replace(handler)
	}

	pub fn get(&self, kind: EventKind) -> Option<Handler> {
		self.slots[kind.index()].clone()
	}
}

impl fmt::Debug for HandlerTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut map = f.debug_map();
		for kind in EventKind::ALL {
			map.entry(&kind, &self.slots[kind.index()].is_some());
		}
		map.finish()
	}
}

#[derive(Debug)]
enum Message {
	Event(Event),
	Sync(flume::Sender<()>),
}

/// Where the OS subsystem reports events for a submitted notification.
///
/// Sending never blocks, so it is fine to call from OS callback threads or while the
/// subsystem holds its own locks.
#[derive(Debug, Clone)]
pub struct EventSink {
	tx: flume::Sender<Message>,
}

impl EventSink {
	pub fn deliver(&self, event: Event) {
		if self.tx.send(Message::Event(event)).is_err() {
			log::debug!("dispatcher is gone, dropping {:?}", event);
		}
	}

	pub fn activated(&self, id: NotificationId, action: Option<usize>) {
		self.deliver(Event::Activated { id, action })
	}

	pub fn dismissed(&self, id: NotificationId, reason: DismissReason) {
		self.deliver(Event::Dismissed { id, reason })
	}

	pub fn failed(&self, id: NotificationId) {
		self.deliver(Event::Failed { id })
	}
}

thread_local! {
	static IN_DISPATCH: Cell<bool> = Cell::new(false);
}

/// Queues OS events and hands them to the registered handlers on a single consumer thread.
///
/// A terminal event retires its notification from the registry before the handler runs, and
/// events for notifications that are no longer live are dropped. Handlers run without the
/// shared lock held, so they may call back into the service.
#[derive(Debug)]
pub struct EventDispatcher {
	state: Arc<Mutex<State>>,
	tx: flume::Sender<Message>,
}

impl EventDispatcher {
	pub(crate) fn spawn(state: Arc<Mutex<State>>) -> Self {
		let (tx, rx) = flume::unbounded();
		let weak = Arc::downgrade(&state);
		async_std::task::spawn_blocking(move || run(rx, weak));
		EventDispatcher { state, tx }
	}

	pub fn sink(&self) -> EventSink {
		EventSink { tx: self.tx.clone() }
	}

	pub fn register_handler(&self, kind: EventKind, handler: Handler) {
		if self.state.lock().handlers.register(kind, handler).is_some() {
			log::debug!("replaced {:?} handler", kind);
		}
	}

	/// Blocks until every event queued before this call has been handled.
	///
	/// Returns immediately when called from a handler.
	pub fn sync(&self) {
		if IN_DISPATCH.with(Cell::get) {
			return;
		}
		let (done_tx, done_rx) = flume::bounded(1);
		if self.tx.send(Message::Sync(done_tx)).is_ok() {
			let _ = done_rx.recv();
		}
	}
}

fn run(rx: flume::Receiver<Message>, state: Weak<Mutex<State>>) {
	IN_DISPATCH.with(|a| a.set(true));
	for msg in rx.iter() {
		let event = match msg {
			Message::Event(event) => event,
			Message::Sync(done) => {
				let _ = done.send(());
				continue;
			}
		};
		let Some(shared) = state.upgrade() else { break };
		let handler = {
			let mut state = shared.lock();
			if state.registry.remove(event.id()).is_none() {
				log::debug!("dropping {:?}, notification is not live", event);
				continue;
			}
			state.handlers.get(event.kind())
		};
		drop(shared);
		match handler {
			Some(handler) => {
				if std::panic::catch_unwind(AssertUnwindSafe(|| handler(&event))).is_err() {
					log::error!("{:?} handler panicked on {}", event.kind(), event.id());
				}
			}
			None => log::debug!("no {:?} handler, dropping event for {}", event.kind(), event.id()),
		}
	}
	IN_DISPATCH.with(|a| a.set(false));
	log::debug!("event dispatcher stopped");
}
