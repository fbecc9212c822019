//! Toast notification lifecycle: build a descriptor, submit it to the OS notification
//! subsystem, track the identifier it hands back and route the OS's activation, dismissal and
//! failure reports to process-wide handlers.

pub mod dbus;
pub mod dispatcher;
pub mod error;
pub mod ffi;
pub mod headless;
pub mod notification;
pub mod registry;
pub mod service;
pub mod types;

pub use dbus::FreedesktopSubsystem;
pub use dispatcher::{EventDispatcher, EventSink, Handler, HandlerTable};
pub use error::{Error, ErrorCode, Result};
pub use headless::HeadlessSubsystem;
pub use notification::{NotificationDescriptor, MAX_BODY_LINES};
pub use registry::{LiveNotification, NotificationRegistry};
pub use service::NotificationService;
pub use types::*;

pub const LOG_ENV: &str = "TSUUCHI_LOG";

/// Installs `env_logger`, filtered by [`LOG_ENV`] (default `info`). Does nothing if a logger is
/// already set.
pub fn init_logging() {
	let _ = env_logger::Builder::from_env(env_logger::Env::default().filter_or(LOG_ENV, "info")).try_init();
}
