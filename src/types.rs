use std::{fmt, path::PathBuf, str::FromStr};

use crate::dispatcher::EventSink;
use crate::error::{Error, Result};

/// Identifier the OS subsystem assigned to a submitted notification.
///
/// Always fits in 63 bits so it can cross the boundary as a non-negative `i64`,
/// leaving `-1` free as the failure sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

impl NotificationId {
	pub fn new(raw: u64) -> Option<Self> {
		(raw <= i64::MAX as u64).then_some(NotificationId(raw))
	}

	pub fn get(self) -> u64 {
		self.0
	}

	pub fn as_i64(self) -> i64 {
		self.0 as i64
	}
}

impl From<u32> for NotificationId {
	fn from(raw: u32) -> Self {
		NotificationId(raw.into())
	}
}

impl fmt::Display for NotificationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OsHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
	Activated,
	Dismissed,
	Failed,
}

impl EventKind {
	pub const ALL: [EventKind; 3] = [EventKind::Activated, EventKind::Dismissed, EventKind::Failed];

	pub(crate) fn index(self) -> usize {
		self as usize
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DismissReason {
	UserCanceled = 0,
	ApplicationHidden = 1,
	TimedOut = 2,
}

impl DismissReason {
	pub fn from_code(code: i32) -> Option<Self> {
		match code {
			0 => Some(DismissReason::UserCanceled),
			1 => Some(DismissReason::ApplicationHidden),
			2 => Some(DismissReason::TimedOut),
			_ => None,
		}
	}
}

/// Terminal event reported by the OS for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
	/// `action` is the index of the clicked button, `None` when the body itself was clicked.
	Activated { id: NotificationId, action: Option<usize> },
	Dismissed { id: NotificationId, reason: DismissReason },
	Failed { id: NotificationId },
}

impl Event {
	pub fn id(&self) -> NotificationId {
		match *self {
			Event::Activated { id, .. } | Event::Dismissed { id, .. } | Event::Failed { id } => id,
		}
	}

	pub fn kind(&self) -> EventKind {
		match self {
			Event::Activated { .. } => EventKind::Activated,
			Event::Dismissed { .. } => EventKind::Dismissed,
			Event::Failed { .. } => EventKind::Failed,
		}
	}

	/// Second callback argument at the boundary: button index or -1, reason code, or 0.
	pub fn payload(&self) -> i32 {
		match *self {
			Event::Activated { action: Some(index), .. } => i32::try_from(index).unwrap_or(i32::MAX),
			Event::Activated { action: None, .. } => -1,
			Event::Dismissed { reason, .. } => reason as i32,
			Event::Failed { .. } => 0,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SoundOption {
	#[default]
	Default,
	Silent,
	Loop,
}

impl TryFrom<i32> for SoundOption {
	type Error = Error;

	fn try_from(raw: i32) -> Result<Self> {
		match raw {
			0 => Ok(SoundOption::Default),
			1 => Ok(SoundOption::Silent),
			2 => Ok(SoundOption::Loop),
			_ => Err(Error::InvalidParameters("sound option out of range")),
		}
	}
}

impl FromStr for SoundOption {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_ascii_lowercase().as_str() {
			"default" => Ok(SoundOption::Default),
			"silent" => Ok(SoundOption::Silent),
			"loop" | "looping" => Ok(SoundOption::Loop),
			_ => Err(Error::InvalidParameters("unknown sound option")),
		}
	}
}

macro_rules! sound_files {
	($($name:ident => $event:literal, $theme:literal;)*) => {
		/// Fixed catalog of system sound assets.
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
		pub enum SoundFile { $($name),* }

		impl SoundFile {
			pub const ALL: &'static [SoundFile] = &[$(SoundFile::$name),*];

			pub fn name(self) -> &'static str {
				match self { $(SoundFile::$name => stringify!($name)),* }
			}

			pub fn uri(self) -> &'static str {
				match self { $(SoundFile::$name => concat!("ms-winsoundevent:Notification.", $event)),* }
			}

			/// Closest name in the freedesktop sound theme.
			pub fn theme_name(self) -> &'static str {
				match self { $(SoundFile::$name => $theme),* }
			}
		}
	};
}

sound_files! {
	DefaultSound => "Default", "message";
	IM => "IM", "message-new-instant";
	Mail => "Mail", "message-new-email";
	Reminder => "Reminder", "alarm-clock-elapsed";
	SMS => "SMS", "message-new-instant";
	Alarm => "Looping.Alarm", "alarm-clock-elapsed";
	Alarm2 => "Looping.Alarm2", "alarm-clock-elapsed";
	Alarm3 => "Looping.Alarm3", "alarm-clock-elapsed";
	Alarm4 => "Looping.Alarm4", "alarm-clock-elapsed";
	Alarm5 => "Looping.Alarm5", "alarm-clock-elapsed";
	Alarm6 => "Looping.Alarm6", "alarm-clock-elapsed";
	Alarm7 => "Looping.Alarm7", "alarm-clock-elapsed";
	Alarm8 => "Looping.Alarm8", "alarm-clock-elapsed";
	Alarm9 => "Looping.Alarm9", "alarm-clock-elapsed";
	Alarm10 => "Looping.Alarm10", "alarm-clock-elapsed";
	Call => "Looping.Call", "phone-incoming-call";
	Call1 => "Looping.Call1", "phone-incoming-call";
	Call2 => "Looping.Call2", "phone-incoming-call";
	Call3 => "Looping.Call3", "phone-incoming-call";
	Call4 => "Looping.Call4", "phone-incoming-call";
	Call5 => "Looping.Call5", "phone-incoming-call";
	Call6 => "Looping.Call6", "phone-incoming-call";
	Call7 => "Looping.Call7", "phone-incoming-call";
	Call8 => "Looping.Call8", "phone-incoming-call";
	Call9 => "Looping.Call9", "phone-incoming-call";
	Call10 => "Looping.Call10", "phone-incoming-call";
}

impl TryFrom<i32> for SoundFile {
	type Error = Error;

	fn try_from(raw: i32) -> Result<Self> {
		usize::try_from(raw).ok()
			.and_then(|i| SoundFile::ALL.get(i).copied())
			.ok_or(Error::InvalidParameters("sound file out of range"))
	}
}

impl FromStr for SoundFile {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		SoundFile::ALL.iter().copied()
			.find(|f| f.name().eq_ignore_ascii_case(s))
			.ok_or(Error::InvalidParameters("unknown sound file"))
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SoundSource {
	Catalog(SoundFile),
	File(PathBuf),
}

impl From<SoundFile> for SoundSource {
	fn from(file: SoundFile) -> Self {
		SoundSource::Catalog(file)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sound {
	pub option: SoundOption,
	pub source: SoundSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DisplayDuration {
	#[default]
	System,
	Short,
	Long,
}

impl FromStr for DisplayDuration {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_ascii_lowercase().as_str() {
			"system" | "default" => Ok(DisplayDuration::System),
			"short" => Ok(DisplayDuration::Short),
			"long" => Ok(DisplayDuration::Long),
			_ => Err(Error::InvalidParameters("unknown duration")),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scenario {
	#[default]
	Default,
	Alarm,
	IncomingCall,
	Reminder,
}

impl FromStr for Scenario {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		match s.to_ascii_lowercase().as_str() {
			"default" => Ok(Scenario::Default),
			"alarm" => Ok(Scenario::Alarm),
			"incoming-call" | "incomingcall" | "call" => Ok(Scenario::IncomingCall),
			"reminder" => Ok(Scenario::Reminder),
			_ => Err(Error::InvalidParameters("unknown scenario")),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationData {
	pub title: String,
	pub lines: Vec<String>,
	pub attribution: Option<String>,
	pub image: Option<PathBuf>,
	pub sound: Option<Sound>,
	pub duration: DisplayDuration,
	pub expiration: Option<std::time::Duration>,
	pub scenario: Scenario,
	pub actions: Vec<String>,
}

impl NotificationData {
	pub fn body(&self) -> String {
		self.lines.join("\n")
	}
}

pub const MAX_AUMI_LEN: usize = 128;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
	app_name: String,
	app_user_model_id: String,
}

impl Identity {
	pub fn new(app_name: impl Into<String>, app_user_model_id: impl Into<String>) -> Result<Self> {
		let app_name = app_name.into();
		let app_user_model_id = app_user_model_id.into();
		if app_name.trim().is_empty() || app_name.contains('\0') {
			return Err(Error::InvalidParameters("app name"));
		}
		if !valid_aumi(&app_user_model_id) {
			return Err(Error::InvalidAppUserModelId(app_user_model_id));
		}
		Ok(Identity { app_name, app_user_model_id })
	}

	/// Builds `company.product[.sub_product][.version]`.
	pub fn configure_aumi(company: &str, product: &str, sub_product: &str, version: &str) -> String {
		[company, product, sub_product, version].iter()
			.filter(|a| !a.is_empty())
			.copied()
			.collect::<Vec<_>>()
			.join(".")
	}

	pub fn app_name(&self) -> &str {
		&self.app_name
	}

	pub fn app_user_model_id(&self) -> &str {
		&self.app_user_model_id
	}
}

impl fmt::Display for Identity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} ({})", self.app_name, self.app_user_model_id)
	}
}

fn valid_aumi(aumi: &str) -> bool {
	!aumi.is_empty()
		&& aumi.chars().count() <= MAX_AUMI_LEN
		&& !aumi.chars().any(|c| c.is_whitespace() || c.is_control())
		&& aumi.split('.').all(|a| !a.is_empty())
}

#[derive(Debug, Clone, Copy)]
pub struct Properties {
	pub name: &'static str,
	pub vendor: &'static str,
	pub version: &'static str,
	pub capabilities: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
	pub id: NotificationId,
	pub handle: OsHandle,
}

/// The OS notification subsystem.
///
/// `submit` hands over a sink for this one notification; the subsystem reports at most one
/// terminal event through it, from whatever thread it likes.
pub trait Subsystem: Send + Sync {
	fn properties(&self) -> Properties;
	fn is_supported(&self) -> bool;
	fn initialize(&self, identity: &Identity) -> Result<()>;
	fn submit(&self, identity: &Identity, data: &NotificationData, sink: EventSink) -> Result<Submission>;
	fn withdraw(&self, handle: OsHandle) -> Result<()>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn ids_stay_within_63_bits() {
		assert!(NotificationId::new(i64::MAX as u64).is_some());
		assert!(NotificationId::new(u64::MAX).is_none());
		assert_eq!(NotificationId::from(7u32).as_i64(), 7);
	}

	#[test]
	fn sound_catalog_matches_boundary_indices() {
		assert_eq!(SoundFile::ALL.len(), 26);
		assert_eq!(SoundFile::try_from(0).unwrap(), SoundFile::DefaultSound);
		assert_eq!(SoundFile::try_from(16).unwrap(), SoundFile::Call1);
		assert_eq!(SoundFile::try_from(25).unwrap(), SoundFile::Call10);
		assert!(SoundFile::try_from(26).is_err());
		assert!(SoundFile::try_from(-1).is_err());
		assert!(SoundOption::try_from(3).is_err());
		assert_eq!(SoundFile::Alarm2.uri(), "ms-winsoundevent:Notification.Looping.Alarm2");
		assert_eq!("call3".parse::<SoundFile>().unwrap(), SoundFile::Call3);
	}

	#[test]
	fn event_payloads() {
		let id = NotificationId::from(3u32);
		assert_eq!(Event::Activated { id, action: None }.payload(), -1);
		assert_eq!(Event::Activated { id, action: Some(1) }.payload(), 1);
		assert_eq!(Event::Dismissed { id, reason: DismissReason::TimedOut }.payload(), 2);
		assert_eq!(Event::Failed { id }.payload(), 0);
		assert_eq!(Event::Failed { id }.kind(), EventKind::Failed);
	}

	#[test]
	fn identity_validation() {
		assert!(Identity::new("Portal", "Acme.Portal.Desktop").is_ok());
		assert!(matches!(Identity::new("", "Acme.Portal"), Err(Error::InvalidParameters(_))));
		assert!(matches!(Identity::new("Portal", ""), Err(Error::InvalidAppUserModelId(_))));
		assert!(matches!(Identity::new("Portal", "Acme..Portal"), Err(Error::InvalidAppUserModelId(_))));
		assert!(matches!(Identity::new("Portal", "Acme Portal"), Err(Error::InvalidAppUserModelId(_))));
		assert!(Identity::new("Portal", "a".repeat(MAX_AUMI_LEN + 1)).is_err());
	}

	#[test]
	fn aumi_skips_empty_parts() {
		assert_eq!(Identity::configure_aumi("Acme", "Portal", "", "1.2"), "Acme.Portal.1.2");
		assert_eq!(Identity::configure_aumi("Acme", "Portal", "Tray", ""), "Acme.Portal.Tray");
	}
}
