//! Flat C-callable surface over a process-wide [`NotificationService`].
//!
//! Descriptors are addressed by non-zero `u64` handles (0 is the null handle), identifiers are
//! `i64` with `-1` meaning failure. Strings are NUL-terminated UTF-8. Nothing here panics or
//! unwinds into the caller; every failure comes back as a status value.

use std::{
	collections::HashMap,
	ffi::{c_char, CStr, CString},
	sync::{atomic::{AtomicU64, Ordering}, Arc},
};

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;

use crate::error::{ErrorCode, Result};
use crate::types::*;
use crate::{FreedesktopSubsystem, NotificationDescriptor, NotificationService};

/// `action` is the button index (-1 for the body), the dismissal reason, or 0 for failures.
/// The return value is ignored.
pub type Callback = extern "C" fn(id: u64, action: i32) -> u64;

static SERVICE: OnceCell<NotificationService> = OnceCell::new();
static DESCRIPTORS: Lazy<HandleTable<NotificationDescriptor>> = Lazy::new(HandleTable::new);
static MESSAGES: Lazy<Vec<CString>> = Lazy::new(|| {
	ErrorCode::ALL.iter()
		.map(|code| CString::new(code.describe()).unwrap_or_default())
		.collect()
});

/// Chooses the subsystem behind the boundary. Only effective before the first boundary call.
pub fn install(subsystem: Arc<dyn Subsystem>) -> bool {
	SERVICE.set(NotificationService::new(subsystem)).is_ok()
}

fn service() -> &'static NotificationService {
	SERVICE.get_or_init(|| NotificationService::new(Arc::new(FreedesktopSubsystem::new())))
}

struct HandleTable<T> {
	next: AtomicU64,
	entries: Mutex<HashMap<u64, T>>,
}

impl<T> HandleTable<T> {
	fn new() -> Self {
		HandleTable { next: AtomicU64::new(1), entries: Mutex::new(HashMap::new()) }
	}

	fn insert(&self, value: T) -> u64 {
		let handle = self.next.fetch_add(1, Ordering::Relaxed);
		self.entries.lock().insert(handle, value);
		handle
	}

	fn with<R>(&self, handle: u64, f: impl FnOnce(&mut T) -> R) -> Option<R> {
		self.entries.lock().get_mut(&handle).map(f)
	}

	fn take(&self, handle: u64) -> Option<T> {
		self.entries.lock().remove(&handle)
	}
}

/// # Safety
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
unsafe fn string<'a>(ptr: *const c_char) -> Option<&'a str> {
	if ptr.is_null() {
		return None;
	}
	unsafe { CStr::from_ptr(ptr) }.to_str().ok()
}

fn status(result: Result<()>) -> u32 {
	match result {
		Ok(()) => ErrorCode::NoError as u32,
		Err(e) => e.code() as u32,
	}
}

/// Returns an [`ErrorCode`].
///
/// # Safety
/// Both arguments must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn tsuuchi_initialize(app_name: *const c_char, app_user_model_id: *const c_char) -> u32 {
	crate::init_logging();
	let (Some(app_name), Some(aumi)) = (unsafe { string(app_name) }, unsafe { string(app_user_model_id) }) else {
		return ErrorCode::InvalidParameters as u32;
	};
	status(service().initialize(app_name, aumi))
}

/// Text for an [`ErrorCode`]; codes outside the table read as [`ErrorCode::UnknownError`].
/// The string is static and must not be freed.
#[no_mangle]
pub extern "C" fn tsuuchi_strerror(code: u32) -> *const c_char {
	let code = ErrorCode::from_code(code).unwrap_or(ErrorCode::UnknownError);
	MESSAGES.get(code as usize).map_or(std::ptr::null(), |a| a.as_ptr())
}

#[no_mangle]
pub extern "C" fn tsuuchi_is_initialized() -> bool {
	service().is_initialized()
}

/// Returns a descriptor handle, or 0 on failure. Every handle must eventually be passed to
/// [`tsuuchi_show`] or [`tsuuchi_delete_notification`].
///
/// # Safety
/// Both arguments must be null or valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn tsuuchi_create_notification(title: *const c_char, body: *const c_char) -> u64 {
	let (Some(title), Some(body)) = (unsafe { string(title) }, unsafe { string(body) }) else {
		return 0;
	};
	match NotificationDescriptor::new(title, body) {
		Ok(descriptor) => DESCRIPTORS.insert(descriptor),
		Err(e) => {
			log::debug!("create_notification: {}", e);
			0
		}
	}
}

#[no_mangle]
pub extern "C" fn tsuuchi_delete_notification(handle: u64) {
	match DESCRIPTORS.take(handle) {
		Some(descriptor) => descriptor.release(),
		None => log::debug!("delete_notification: unknown handle {}", handle),
	}
}

/// # Safety
/// `label` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn tsuuchi_add_button(handle: u64, label: *const c_char) -> bool {
	let Some(label) = (unsafe { string(label) }) else { return false };
	DESCRIPTORS.with(handle, |n| n.add_button(label).is_ok()).unwrap_or(false)
}

/// # Safety
/// `path` must be null or a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn tsuuchi_set_image(handle: u64, path: *const c_char) -> bool {
	let Some(path) = (unsafe { string(path) }) else { return false };
	DESCRIPTORS.with(handle, |n| { n.set_image(path); }).is_some()
}

/// `option` is 0-2 (default, silent, loop), `file` indexes the 26-entry [`SoundFile`] catalog.
/// Values outside those ranges are rejected and leave the descriptor unchanged.
#[no_mangle]
pub extern "C" fn tsuuchi_set_sound(handle: u64, option: i32, file: i32) -> bool {
	let (Ok(option), Ok(file)) = (SoundOption::try_from(option), SoundFile::try_from(file)) else {
		return false;
	};
	DESCRIPTORS.with(handle, |n| { n.set_sound(option, file); }).is_some()
}

/// Consumes the descriptor handle whatever the outcome. Returns the identifier or -1.
#[no_mangle]
pub extern "C" fn tsuuchi_show(handle: u64) -> i64 {
	let Some(descriptor) = DESCRIPTORS.take(handle) else {
		log::debug!("show: unknown handle {}", handle);
		return -1;
	};
	match service().show(descriptor) {
		Ok(id) => id.as_i64(),
		Err(e) => {
			log::debug!("show: {}", e);
			-1
		}
	}
}

#[no_mangle]
pub extern "C" fn tsuuchi_hide(id: i64) -> bool {
	let Some(id) = u64::try_from(id).ok().and_then(NotificationId::new) else { return false };
	service().hide(id).is_ok()
}

#[no_mangle]
pub extern "C" fn tsuuchi_clear() -> bool {
	service().clear().is_ok()
}

fn register(kind: EventKind, callback: Option<Callback>) -> bool {
	let Some(callback) = callback else { return false };
	service().register_handler(kind, Arc::new(move |e: &Event| {
		callback(e.id().get(), e.payload());
	}));
	true
}

#[no_mangle]
pub extern "C" fn tsuuchi_register_activated_handler(callback: Option<Callback>) -> bool {
	register(EventKind::Activated, callback)
}

#[no_mangle]
pub extern "C" fn tsuuchi_register_dismissed_handler(callback: Option<Callback>) -> bool {
	register(EventKind::Dismissed, callback)
}

#[no_mangle]
pub extern "C" fn tsuuchi_register_failed_handler(callback: Option<Callback>) -> bool {
	register(EventKind::Failed, callback)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn handles_are_single_use() {
		let table = HandleTable::new();
		let a = table.insert("a");
		let b = table.insert("b");
		assert_ne!(a, 0);
		assert_ne!(a, b);
		assert_eq!(table.with(a, |v| *v), Some("a"));
		assert_eq!(table.take(a), Some("a"));
		assert_eq!(table.take(a), None);
		assert_eq!(table.with(a, |v| *v), None);
		assert_eq!(table.with(0, |v| *v), None);
	}

	#[test]
	fn null_strings_are_rejected() {
		assert_eq!(unsafe { string(std::ptr::null()) }, None);
		let s = std::ffi::CString::new("toast").unwrap();
		assert_eq!(unsafe { string(s.as_ptr()) }, Some("toast"));
		assert_eq!(status(Ok(())), 0);
	}

	#[test]
	fn error_text_is_static() {
		let text = |code| unsafe { CStr::from_ptr(tsuuchi_strerror(code)) }.to_str().unwrap();
		assert_eq!(text(ErrorCode::UnknownNotification as u32), ErrorCode::UnknownNotification.describe());
		assert_eq!(text(0), ErrorCode::NoError.describe());
		assert_eq!(text(77), ErrorCode::UnknownError.describe());
		assert_eq!(tsuuchi_strerror(1), tsuuchi_strerror(1));
	}
}
