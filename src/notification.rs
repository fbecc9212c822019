use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::*;

/// Body lines below the title; the richest text template has three fields in total.
pub const MAX_BODY_LINES: usize = 2;

/// Content of one notification before it is submitted.
///
/// Submitting through [`NotificationService::show`](crate::NotificationService::show) consumes
/// the descriptor whether or not the OS accepts it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationDescriptor {
	data: NotificationData,
}

impl NotificationDescriptor {
	pub fn new(title: impl Into<String>, body: impl Into<String>) -> Result<Self> {
		let title = text(title.into(), "title")?;
		let body = text(body.into(), "body")?;
		Ok(NotificationDescriptor {
			data: NotificationData {
				title,
				lines: Some(body).filter(|a| !a.is_empty()).into_iter().collect(),
				attribution: None,
				image: None,
				sound: None,
				duration: DisplayDuration::default(),
				expiration: None,
				scenario: Scenario::default(),
				actions: Vec::new(),
			},
		})
	}

	pub fn add_line(&mut self, line: impl Into<String>) -> Result<&mut Self> {
		if self.data.lines.len() >= MAX_BODY_LINES {
			return Err(Error::InvalidParameters("too many text lines"));
		}
		self.data.lines.push(text(line.into(), "line")?);
		Ok(self)
	}

	/// Small print shown below the body, naming where the notification came from.
	pub fn set_attribution(&mut self, attribution: impl Into<String>) -> Result<&mut Self> {
		let attribution = text(attribution.into(), "attribution")?;
		self.data.attribution = Some(attribution).filter(|a| !a.is_empty());
		Ok(self)
	}

	/// The renderer may drop buttons past its own limit; nothing is enforced here.
	pub fn add_button(&mut self, label: impl Into<String>) -> Result<&mut Self> {
		self.data.actions.push(text(label.into(), "button label")?);
		Ok(self)
	}

	/// Existence is checked at submission, where a missing file only drops the image.
	pub fn set_image(&mut self, path: impl Into<PathBuf>) -> &mut Self {
		self.data.image = Some(path.into());
		self
	}

	pub fn set_sound(&mut self, option: SoundOption, file: SoundFile) -> &mut Self {
		self.data.sound = Some(Sound { option, source: file.into() });
		self
	}

	/// Plays a custom audio file instead of a catalog sound.
	pub fn set_sound_file(&mut self, option: SoundOption, path: impl Into<PathBuf>) -> &mut Self {
		self.data.sound = Some(Sound { option, source: SoundSource::File(path.into()) });
		self
	}

	pub fn set_duration(&mut self, duration: DisplayDuration) -> &mut Self {
		self.data.duration = duration;
		self
	}

	pub fn set_expiration(&mut self, expiration: std::time::Duration) -> &mut Self {
		self.data.expiration = Some(expiration);
		self
	}

	pub fn set_scenario(&mut self, scenario: Scenario) -> &mut Self {
		self.data.scenario = scenario;
		self
	}

	pub fn data(&self) -> &NotificationData {
		&self.data
	}

	pub fn release(self) {
		log::trace!("released descriptor {:?}", self.data.title);
	}

	pub(crate) fn into_data(self) -> NotificationData {
		self.data
	}
}

fn text(s: String, what: &'static str) -> Result<String> {
	if s.contains('\0') {
		Err(Error::InvalidParameters(what))
	} else {
		Ok(s)
	}
}
