use std::{collections::HashMap, fmt, sync::Arc};

use async_std::{stream::StreamExt, task};
use parking_lot::Mutex;
use zbus::zvariant::Value;

use crate::dispatcher::EventSink;
use crate::error::{Error, Result};
use crate::types::*;

const DEFAULT_ACTION: &str = "default";

#[zbus::dbus_proxy(
	interface = "org.freedesktop.Notifications",
	default_service = "org.freedesktop.Notifications",
	default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
	fn notify(
		&self,
		app_name: &str,
		replaces_id: u32,
		app_icon: &str,
		summary: &str,
		body: &str,
		actions: &[&str],
		hints: &HashMap<&str, &Value<'_>>,
		expire_timeout: i32,
	) -> zbus::Result<u32>;

	fn close_notification(&self, id: u32) -> zbus::Result<()>;

	fn get_server_information(&self) -> zbus::Result<(String, String, String, String)>;

	#[dbus_proxy(signal)]
	fn notification_closed(&self, id: u32, reason: u32) -> zbus::Result<()>;

	#[dbus_proxy(signal)]
	fn action_invoked(&self, id: u32, action_key: String) -> zbus::Result<()>;
}

type Sinks = Arc<Mutex<HashMap<u32, EventSink>>>;

/// Client of the `org.freedesktop.Notifications` service on the session bus.
///
/// Signals are broadcast to every client, so only identifiers this process submitted are
/// forwarded.
pub struct FreedesktopSubsystem {
	proxy: Mutex<Option<NotificationsProxy<'static>>>,
	sinks: Sinks,
}

impl FreedesktopSubsystem {
	pub const PROPERTIES: Properties = Properties {
		name: "freedesktop",
		vendor: "tsuuchi",
		version: env!("CARGO_PKG_VERSION"),
		capabilities: &["actions", "body", "icon-static", "sound"],
	};

	pub fn new() -> Self {
		FreedesktopSubsystem { proxy: Mutex::new(None), sinks: Default::default() }
	}

	fn proxy(&self) -> Result<NotificationsProxy<'static>> {
		self.proxy.lock().clone().ok_or(Error::NotInitialized)
	}
}

impl Default for FreedesktopSubsystem {
	fn default() -> Self {
		Self::new()
	}
}

impl fmt::Debug for FreedesktopSubsystem {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("FreedesktopSubsystem")
			.field("connected", &self.proxy.lock().is_some())
			.field("pending", &self.sinks.lock().len())
			.finish()
	}
}

impl Subsystem for FreedesktopSubsystem {
	fn properties(&self) -> Properties {
		Self::PROPERTIES
	}

	fn is_supported(&self) -> bool {
		cfg!(unix)
	}

	fn initialize(&self, _identity: &Identity) -> Result<()> {
		let mut proxy = self.proxy.lock();
		if proxy.is_none() {
			let connected = task::block_on(connect(self.sinks.clone())).map_err(|e| {
				log::warn!("no notification server on the session bus: {}", e);
				Error::SystemNotSupported
			})?;
			*proxy = Some(connected);
		}
		Ok(())
	}

	fn submit(&self, identity: &Identity, data: &NotificationData, sink: EventSink) -> Result<Submission> {
		let proxy = self.proxy()?;
		let actions = actions(data);
		let actions = actions.iter().map(String::as_str).collect::<Vec<_>>();
		let hints = hints(identity, data);
		let hints = hints.iter().map(|(k, v)| (*k, v)).collect::<HashMap<_, _>>();

		// Held across the call so a signal for the new id cannot overtake the insert.
		let mut sinks = self.sinks.lock();
		let raw = task::block_on(proxy.notify(
			identity.app_name(),
			0,
			"",
			&data.title,
			&body(data),
			&actions,
			&hints,
			expire_timeout(data),
		)).map_err(|e| Error::NotDisplayed(e.to_string()))?;
		sinks.insert(raw, sink);
		Ok(Submission { id: raw.into(), handle: OsHandle(raw.into()) })
	}

	fn withdraw(&self, handle: OsHandle) -> Result<()> {
		let proxy = self.proxy()?;
		let raw = u32::try_from(handle.0).map_err(|_| Error::InvalidParameters("handle"))?;
		self.sinks.lock().remove(&raw);
		task::block_on(proxy.close_notification(raw))?;
		Ok(())
	}
}

async fn connect(sinks: Sinks) -> zbus::Result<NotificationsProxy<'static>> {
	let conn = zbus::Connection::session().await?;
	let proxy = NotificationsProxy::new(&conn).await?;
	let (name, vendor, version, spec) = proxy.get_server_information().await?;
	log::debug!("notification server {} {} by {} (spec {})", name, version, vendor, spec);

	let actions = proxy.receive_action_invoked().await?;
	let closed = proxy.receive_notification_closed().await?;
	task::spawn(forward_actions(actions, sinks.clone()));
	task::spawn(forward_closed(closed, sinks));
	Ok(proxy)
}

async fn forward_actions(mut stream: ActionInvokedStream<'static>, sinks: Sinks) {
	while let Some(signal) = stream.next().await {
		match signal.args() {
			Ok(args) => { action_invoked(&sinks, *args.id(), args.action_key()); }
			Err(e) => log::warn!("malformed ActionInvoked signal: {}", e),
		}
	}
}

async fn forward_closed(mut stream: NotificationClosedStream<'static>, sinks: Sinks) {
	while let Some(signal) = stream.next().await {
		match signal.args() {
			Ok(args) => { notification_closed(&sinks, *args.id(), *args.reason()); }
			Err(e) => log::warn!("malformed NotificationClosed signal: {}", e),
		}
	}
}

/// Returns whether the signal was forwarded. The sink is claimed only for a known action key.
fn action_invoked(sinks: &Sinks, raw: u32, key: &str) -> bool {
	let Some(action) = action(key) else {
		log::debug!("ignoring unknown action {:?} on {}", key, raw);
		return false;
	};
	match sinks.lock().remove(&raw) {
		Some(sink) => {
			sink.activated(raw.into(), action);
			true
		}
		None => false,
	}
}

fn notification_closed(sinks: &Sinks, raw: u32, reason: u32) -> bool {
	let Some(sink) = sinks.lock().remove(&raw) else { return false };
	match close_reason(reason) {
		Some(reason) => sink.dismissed(raw.into(), reason),
		None => sink.failed(raw.into()),
	}
	true
}

/// `None` for an unknown key, `Some(None)` for a click on the body.
fn action(key: &str) -> Option<Option<usize>> {
	match key {
		DEFAULT_ACTION => Some(None),
		key => key.parse().ok().map(Some),
	}
}

fn close_reason(reason: u32) -> Option<DismissReason> {
	match reason {
		1 => Some(DismissReason::TimedOut),
		2 => Some(DismissReason::UserCanceled),
		3 => Some(DismissReason::ApplicationHidden),
		_ => None,
	}
}

fn actions(data: &NotificationData) -> Vec<String> {
	let mut actions = vec![DEFAULT_ACTION.to_owned(), String::new()];
	for (i, label) in data.actions.iter().enumerate() {
		actions.push(i.to_string());
		actions.push(label.clone());
	}
	actions
}

fn body(data: &NotificationData) -> String {
	let mut body = data.body();
	if let Some(attribution) = &data.attribution {
		if !body.is_empty() {
			body.push('\n');
		}
		body.push_str(attribution);
	}
	body
}

fn hints<'a>(identity: &'a Identity, data: &'a NotificationData) -> HashMap<&'static str, Value<'a>> {
	let mut hints = HashMap::new();
	hints.insert("desktop-entry", Value::from(identity.app_user_model_id()));
	hints.insert("urgency", Value::U8(urgency(data.scenario)));
	if let Some(path) = &data.image {
		match path.to_str() {
			Some(path) => { hints.insert("image-path", Value::from(path)); }
			None => log::warn!("image path {} is not UTF-8, dropping it", path.display()),
		}
	}
	match &data.sound {
		Some(Sound { option: SoundOption::Silent, .. }) => {
			hints.insert("suppress-sound", Value::Bool(true));
		}
		Some(Sound { option, source }) => {
			if *option == SoundOption::Loop {
				log::debug!("looping sounds are not supported, playing {:?} once", source);
			}
			match source {
				SoundSource::Catalog(file) => { hints.insert("sound-name", Value::from(file.theme_name())); }
				SoundSource::File(path) => match path.to_str() {
					Some(path) => { hints.insert("sound-file", Value::from(path)); }
					None => log::warn!("sound path {} is not UTF-8, dropping it", path.display()),
				},
			}
		}
		None => {}
	}
	hints
}

fn urgency(scenario: Scenario) -> u8 {
	match scenario {
		Scenario::Alarm | Scenario::IncomingCall => 2,
		Scenario::Default | Scenario::Reminder => 1,
	}
}

// 0 means "never expire" on the bus.
fn expire_timeout(data: &NotificationData) -> i32 {
	match (data.expiration.filter(|a| !a.is_zero()), data.duration) {
		(Some(expiration), _) => i32::try_from(expiration.as_millis()).unwrap_or(i32::MAX).max(1),
		(None, DisplayDuration::Short) => 7_000,
		(None, DisplayDuration::Long) => 25_000,
		(None, DisplayDuration::System) => -1,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dispatcher::EventDispatcher;
	use crate::notification::NotificationDescriptor;
	use crate::registry::LiveNotification;
	use crate::service::State;
	use std::{sync::mpsc, time::Duration};

	fn data() -> NotificationData {
		let mut n = NotificationDescriptor::new("Blocked", "example.com").unwrap();
		n.add_button("Allow").unwrap().add_button("Block").unwrap();
		n.data().clone()
	}

	#[test]
	fn actions_lead_with_the_body_click() {
		assert_eq!(actions(&data()), ["default", "", "0", "Allow", "1", "Block"]);
	}

	#[test]
	fn close_reasons() {
		assert_eq!(close_reason(1), Some(DismissReason::TimedOut));
		assert_eq!(close_reason(2), Some(DismissReason::UserCanceled));
		assert_eq!(close_reason(3), Some(DismissReason::ApplicationHidden));
		assert_eq!(close_reason(4), None);
	}

	#[test]
	fn timeouts() {
		let mut data = data();
		assert_eq!(expire_timeout(&data), -1);
		data.duration = DisplayDuration::Short;
		assert_eq!(expire_timeout(&data), 7_000);
		data.expiration = Some(Duration::from_secs(2));
		assert_eq!(expire_timeout(&data), 2_000);
		data.expiration = Some(Duration::from_micros(500));
		assert_eq!(expire_timeout(&data), 1);
		data.expiration = Some(Duration::ZERO);
		assert_eq!(expire_timeout(&data), 7_000);
		data.duration = DisplayDuration::System;
		assert_eq!(expire_timeout(&data), -1);
		data.expiration = Some(Duration::from_secs(u64::MAX));
		assert_eq!(expire_timeout(&data), i32::MAX);
	}

	#[test]
	fn silent_sound_suppresses() {
		let identity = Identity::new("Portal", "Acme.Portal").unwrap();
		let mut data = data();
		data.scenario = Scenario::IncomingCall;
		data.sound = Some(Sound { option: SoundOption::Silent, source: SoundFile::Call.into() });
		let hints = hints(&identity, &data);
		assert_eq!(hints.get("suppress-sound"), Some(&Value::Bool(true)));
		assert_eq!(hints.get("urgency"), Some(&Value::U8(2)));
		assert!(!hints.contains_key("sound-name"));
		assert!(!hints.contains_key("image-path"));
	}

	#[test]
	fn sound_sources() {
		let identity = Identity::new("Portal", "Acme.Portal").unwrap();
		let mut data = data();
		data.sound = Some(Sound { option: SoundOption::Default, source: SoundFile::Mail.into() });
		assert_eq!(hints(&identity, &data).get("sound-name"), Some(&Value::from("message-new-email")));
		data.sound = Some(Sound { option: SoundOption::Loop, source: SoundSource::File("/tmp/ping.oga".into()) });
		let hints = hints(&identity, &data);
		assert_eq!(hints.get("sound-file"), Some(&Value::from("/tmp/ping.oga")));
		assert!(!hints.contains_key("sound-name"));
	}

	#[test]
	fn attribution_trails_the_body() {
		let mut n = NotificationDescriptor::new("Blocked", "example.com").unwrap();
		n.add_line("port 443").unwrap().set_attribution("via Acme Portal").unwrap();
		assert_eq!(body(n.data()), "example.com\nport 443\nvia Acme Portal");
		let mut n = NotificationDescriptor::new("Blocked", "").unwrap();
		n.set_attribution("via Acme Portal").unwrap();
		assert_eq!(body(n.data()), "via Acme Portal");
	}

	#[test]
	fn action_keys() {
		assert_eq!(action("default"), Some(None));
		assert_eq!(action("0"), Some(Some(0)));
		assert_eq!(action("2"), Some(Some(2)));
		assert_eq!(action("bogus"), None);
		assert_eq!(action("-1"), None);
		assert_eq!(action(""), None);
	}

	fn pending(live: &[u32]) -> (EventDispatcher, Sinks, mpsc::Receiver<Event>) {
		let mut state = State::default();
		for &n in live {
			state.registry.insert(LiveNotification { id: n.into(), handle: OsHandle(n.into()) });
		}
		let dispatcher = EventDispatcher::spawn(Arc::new(Mutex::new(state)));
		let sinks = Sinks::default();
		for &n in live {
			sinks.lock().insert(n, dispatcher.sink());
		}
		let (tx, rx) = mpsc::channel();
		let tx = Mutex::new(tx);
		let handler: crate::Handler = Arc::new(move |e: &Event| { tx.lock().send(*e).ok(); });
		for kind in EventKind::ALL {
			dispatcher.register_handler(kind, handler.clone());
		}
		(dispatcher, sinks, rx)
	}

	#[test]
	fn signals_reach_only_our_notifications() {
		let (dispatcher, sinks, rx) = pending(&[7, 8]);
		assert!(!action_invoked(&sinks, 7, "bogus"));
		assert!(sinks.lock().contains_key(&7));
		assert!(!action_invoked(&sinks, 99, "default"));
		assert!(!notification_closed(&sinks, 99, 2));

		assert!(action_invoked(&sinks, 7, "2"));
		assert!(!action_invoked(&sinks, 7, "default"));
		assert!(!notification_closed(&sinks, 7, 2));
		assert!(action_invoked(&sinks, 8, "default"));
		dispatcher.sync();

		assert_eq!(rx.try_recv().unwrap(), Event::Activated { id: 7u32.into(), action: Some(2) });
		assert_eq!(rx.try_recv().unwrap(), Event::Activated { id: 8u32.into(), action: None });
		assert!(rx.try_recv().is_err());
		assert!(sinks.lock().is_empty());
	}

	#[test]
	fn closed_signals_map_to_dismissals_and_failures() {
		let (dispatcher, sinks, rx) = pending(&[1, 2]);
		assert!(notification_closed(&sinks, 1, 1));
		assert!(notification_closed(&sinks, 2, 4));
		assert!(!notification_closed(&sinks, 1, 3));
		dispatcher.sync();

		assert_eq!(rx.try_recv().unwrap(), Event::Dismissed { id: 1u32.into(), reason: DismissReason::TimedOut });
		assert_eq!(rx.try_recv().unwrap(), Event::Failed { id: 2u32.into() });
		assert!(rx.try_recv().is_err());
	}
}
