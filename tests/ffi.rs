use std::{ffi::CString, sync::Arc, thread, time::Duration};

use once_cell::sync::Lazy;
use parking_lot::{const_mutex, Mutex};
use tsuuchi::ffi::*;
use tsuuchi::*;

static HEADLESS: Lazy<Arc<HeadlessSubsystem>> = Lazy::new(|| {
	let headless = Arc::new(HeadlessSubsystem::new());
	assert!(install(headless.clone()));
	headless
});

// Boundary state is process-wide; tests touching it run one at a time.
static SERIAL: Mutex<()> = const_mutex(());
static EVENTS: Mutex<Vec<(EventKind, u64, i32)>> = const_mutex(Vec::new());

extern "C" fn on_activated(id: u64, action: i32) -> u64 {
	EVENTS.lock().push((EventKind::Activated, id, action));
	0
}

extern "C" fn on_dismissed(id: u64, reason: i32) -> u64 {
	EVENTS.lock().push((EventKind::Dismissed, id, reason));
	0
}

extern "C" fn on_failed(id: u64, zero: i32) -> u64 {
	EVENTS.lock().push((EventKind::Failed, id, zero));
	0
}

fn c(s: &str) -> CString {
	CString::new(s).unwrap()
}

fn initialize() -> &'static HeadlessSubsystem {
	let headless = &**HEADLESS;
	let (name, aumi) = (c("Portal"), c("Acme.Portal"));
	assert_eq!(unsafe { tsuuchi_initialize(name.as_ptr(), aumi.as_ptr()) }, 0);
	assert!(tsuuchi_register_activated_handler(Some(on_activated)));
	assert!(tsuuchi_register_dismissed_handler(Some(on_dismissed)));
	assert!(tsuuchi_register_failed_handler(Some(on_failed)));
	headless
}

fn create(title: &str) -> u64 {
	let (title, body) = (c(title), c("body"));
	let handle = unsafe { tsuuchi_create_notification(title.as_ptr(), body.as_ptr()) };
	assert_ne!(handle, 0);
	handle
}

fn wait_for_event(id: i64) -> Option<(EventKind, u64, i32)> {
	for _ in 0..200 {
		if let Some(e) = EVENTS.lock().iter().find(|e| e.1 == id as u64) {
			return Some(*e);
		}
		thread::sleep(Duration::from_millis(10));
	}
	None
}

#[test]
fn null_arguments_fail_locally() {
	let _serial = SERIAL.lock();
	let _ = &*HEADLESS;
	let body = c("body");
	let null = std::ptr::null();

	assert_eq!(unsafe { tsuuchi_initialize(null, body.as_ptr()) }, ErrorCode::InvalidParameters as u32);
	assert_eq!(unsafe { tsuuchi_create_notification(null, body.as_ptr()) }, 0);
	assert!(!unsafe { tsuuchi_add_button(0, body.as_ptr()) });
	assert!(!tsuuchi_register_activated_handler(None));
	assert!(!tsuuchi_register_dismissed_handler(None));
	assert!(!tsuuchi_register_failed_handler(None));
	assert_eq!(tsuuchi_show(0), -1);
	assert!(!tsuuchi_hide(-1));

	let handle = create("t");
	assert!(!unsafe { tsuuchi_add_button(handle, null) });
	assert!(!unsafe { tsuuchi_set_image(handle, null) });
	tsuuchi_delete_notification(handle);
	assert!(!unsafe { tsuuchi_add_button(handle, body.as_ptr()) });
}

#[test]
fn initialize_codes() {
	let _serial = SERIAL.lock();
	initialize();
	assert!(tsuuchi_is_initialized());
	let (name, aumi) = (c("Other"), c("Acme.Other"));
	assert_eq!(unsafe { tsuuchi_initialize(name.as_ptr(), aumi.as_ptr()) }, ErrorCode::AlreadyInitialized as u32);
	let (name, aumi) = (c("Portal"), c("not valid"));
	assert_eq!(unsafe { tsuuchi_initialize(name.as_ptr(), aumi.as_ptr()) }, ErrorCode::InvalidAppUserModelId as u32);
	initialize();
}

#[test]
fn show_consumes_the_handle() {
	let _serial = SERIAL.lock();
	let headless = initialize();
	let handle = create("Connection");
	let (allow, block, image) = (c("Allow"), c("Block"), c("/definitely/not/here.png"));
	assert!(unsafe { tsuuchi_add_button(handle, allow.as_ptr()) });
	assert!(unsafe { tsuuchi_add_button(handle, block.as_ptr()) });
	assert!(unsafe { tsuuchi_set_image(handle, image.as_ptr()) });
	assert!(tsuuchi_set_sound(handle, 1, 2));
	assert!(!tsuuchi_set_sound(handle, 3, 0));
	assert!(!tsuuchi_set_sound(handle, 0, 26));

	let id = tsuuchi_show(handle);
	assert!(id >= 0);
	assert_eq!(tsuuchi_show(handle), -1);
	assert!(!unsafe { tsuuchi_add_button(handle, allow.as_ptr()) });
	assert!(!tsuuchi_set_sound(handle, 0, 0));

	let data = headless.content(NotificationId::new(id as u64).unwrap()).unwrap();
	assert_eq!(data.actions, ["Allow", "Block"]);
	assert_eq!(data.image, None);
	assert_eq!(data.sound, Some(Sound { option: SoundOption::Silent, source: SoundSource::Catalog(SoundFile::Mail) }));
	assert!(tsuuchi_hide(id));
}

#[test]
fn events_reach_callbacks() {
	let _serial = SERIAL.lock();
	let headless = initialize();

	let clicked = tsuuchi_show(create("clicked"));
	headless.activate(NotificationId::new(clicked as u64).unwrap(), Some(1));
	assert_eq!(wait_for_event(clicked), Some((EventKind::Activated, clicked as u64, 1)));
	assert!(!tsuuchi_hide(clicked));

	let expired = tsuuchi_show(create("expired"));
	headless.dismiss(NotificationId::new(expired as u64).unwrap(), DismissReason::TimedOut);
	assert_eq!(wait_for_event(expired), Some((EventKind::Dismissed, expired as u64, 2)));

	let broken = tsuuchi_show(create("broken"));
	headless.fail(NotificationId::new(broken as u64).unwrap());
	assert_eq!(wait_for_event(broken), Some((EventKind::Failed, broken as u64, 0)));
}

#[test]
fn hide_succeeds_once() {
	let _serial = SERIAL.lock();
	initialize();
	let id = tsuuchi_show(create("hidden"));
	assert!(tsuuchi_hide(id));
	assert!(!tsuuchi_hide(id));
	assert!(tsuuchi_clear());
}
