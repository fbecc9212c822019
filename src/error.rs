use crate::types::NotificationId;

/// Numeric status reported across the flat boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
	NoError = 0,
	NotInitialized = 1,
	SystemNotSupported = 2,
	InvalidAppUserModelId = 3,
	InvalidParameters = 4,
	InvalidHandler = 5,
	NotDisplayed = 6,
	UnknownNotification = 7,
	AlreadyInitialized = 8,
	UnknownError = 9,
}

impl ErrorCode {
	pub const ALL: [ErrorCode; 10] = [
		ErrorCode::NoError,
		ErrorCode::NotInitialized,
		ErrorCode::SystemNotSupported,
		ErrorCode::InvalidAppUserModelId,
		ErrorCode::InvalidParameters,
		ErrorCode::InvalidHandler,
		ErrorCode::NotDisplayed,
		ErrorCode::UnknownNotification,
		ErrorCode::AlreadyInitialized,
		ErrorCode::UnknownError,
	];

	pub fn from_code(code: u32) -> Option<Self> {
		ErrorCode::ALL.get(usize::try_from(code).ok()?).copied()
	}

	pub fn describe(self) -> &'static str {
		match self {
			ErrorCode::NoError => "No error. The process was executed correctly",
			ErrorCode::NotInitialized => "The library has not been initialized",
			ErrorCode::SystemNotSupported => "The OS does not support notifications",
			ErrorCode::InvalidAppUserModelId => "The application user model id is not valid",
			ErrorCode::InvalidParameters => "The parameters used are not valid",
			ErrorCode::InvalidHandler => "The handler is not valid",
			ErrorCode::NotDisplayed => "The notification was created correctly but there was an error while showing it",
			ErrorCode::UnknownNotification => "No live notification has this identifier",
			ErrorCode::AlreadyInitialized => "The library was already initialized with a different identity",
			ErrorCode::UnknownError => "Unknown error",
		}
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("notifications have not been initialized")]
	NotInitialized,
	#[error("notifications are not supported on this system")]
	SystemNotSupported,
	#[error("invalid application user model id {0:?}")]
	InvalidAppUserModelId(String),
	#[error("invalid parameters: {0}")]
	InvalidParameters(&'static str),
	#[error("notification could not be displayed: {0}")]
	NotDisplayed(String),
	#[error("no live notification with id {0}")]
	UnknownNotification(NotificationId),
	#[error("already initialized as {current:?}")]
	AlreadyInitialized { current: String },
	#[error(transparent)]
	Dbus(#[from] zbus::Error),
}

impl Error {
	pub fn code(&self) -> ErrorCode {
		match self {
			Error::NotInitialized => ErrorCode::NotInitialized,
			Error::SystemNotSupported => ErrorCode::SystemNotSupported,
			Error::InvalidAppUserModelId(_) => ErrorCode::InvalidAppUserModelId,
			Error::InvalidParameters(_) => ErrorCode::InvalidParameters,
			Error::NotDisplayed(_) => ErrorCode::NotDisplayed,
			Error::UnknownNotification(_) => ErrorCode::UnknownNotification,
			Error::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
			Error::Dbus(_) => ErrorCode::UnknownError,
		}
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
