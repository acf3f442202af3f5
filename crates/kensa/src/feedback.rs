use serde::Serialize;

/// Receiver of everything a validation run has to say.
///
/// All methods are notifications: they can not fail and can not abort the run.
pub trait ValidationFeedback {
    /// Progress and other informational notices.
    fn info(&mut self, message: &str);

    /// The raw manifest text exactly as it was downloaded.
    fn downloaded_manifest(&mut self, manifest: &str);

    /// One detected defect, such as a gap in a segment timeline.
    fn invalid_content(&mut self, message: &str);

    /// The manifest is ambiguous and part of it will be ignored.
    fn will_skip_some_data(&mut self, message: &str);
}

impl<T> ValidationFeedback for &mut T
where
    T: ValidationFeedback + ?Sized,
{
    fn info(&mut self, message: &str) {
        (**self).info(message)
    }

    fn downloaded_manifest(&mut self, manifest: &str) {
        (**self).downloaded_manifest(manifest)
    }

    fn invalid_content(&mut self, message: &str) {
        (**self).invalid_content(message)
    }

    fn will_skip_some_data(&mut self, message: &str) {
        (**self).will_skip_some_data(message)
    }
}

/// A recorded notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FeedbackEvent {
    Info(String),
    DownloadedManifest(String),
    InvalidContent(String),
    WillSkipSomeData(String),
}

/// Feedback sink that keeps every notice in order of arrival.
///
/// With [`CollectingFeedback::echo`] every notice is also logged through `tracing`.
#[derive(Debug, Default)]
pub struct CollectingFeedback {
    events: Vec<FeedbackEvent>,
    echo: bool,
}

impl CollectingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn echo() -> Self {
        Self {
            events: Vec::new(),
            echo: true,
        }
    }

    pub fn events(&self) -> &[FeedbackEvent] {
        &self.events
    }

    pub fn infos(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            FeedbackEvent::Info(message) => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn invalid_contents(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            FeedbackEvent::InvalidContent(message) => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn skipped_data(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|event| match event {
            FeedbackEvent::WillSkipSomeData(message) => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn invalid_content_count(&self) -> usize {
        self.invalid_contents().count()
    }
}

impl ValidationFeedback for CollectingFeedback {
    fn info(&mut self, message: &str) {
        if self.echo {
            tracing::info!("{message}");
        }
        self.events.push(FeedbackEvent::Info(message.to_string()));
    }

    fn downloaded_manifest(&mut self, manifest: &str) {
        if self.echo {
            tracing::debug!(length = manifest.len(), "Downloaded manifest:\n{manifest}");
        }
        self.events
            .push(FeedbackEvent::DownloadedManifest(manifest.to_string()));
    }

    fn invalid_content(&mut self, message: &str) {
        if self.echo {
            tracing::error!("Invalid content: {message}");
        }
        self.events
            .push(FeedbackEvent::InvalidContent(message.to_string()));
    }

    fn will_skip_some_data(&mut self, message: &str) {
        if self.echo {
            tracing::warn!("Skipping data: {message}");
        }
        self.events
            .push(FeedbackEvent::WillSkipSomeData(message.to_string()));
    }
}
