//! Timeline coverage validator for live MPEG-DASH manifests.
//!
//! ```text
//!  manifest URL ──► fetch ──► loader ──► sanity ──► clock sync ──► coverage
//!                                                                     │
//!                                          ValidationFeedback ◄───────┘
//! ```
//!
//! A run downloads a dynamic MPD, synchronizes against its `http-iso` time source and
//! verifies that every timeline covers the playback window without gaps at the moment
//! the manifest was downloaded. Defects are reported through [`ValidationFeedback`];
//! only conditions that prevent the check from running are returned as [`KensaError`].
pub mod clock;
pub mod coverage;
pub mod error;
pub mod feedback;
pub mod http;
pub mod loader;
pub mod model;
pub mod sanity;
pub mod time;
pub mod validate;

pub use error::{ErrorKind, KensaError, KensaResult};
pub use feedback::{CollectingFeedback, FeedbackEvent, ValidationFeedback};
pub use http::{Fetcher, HttpClient, HttpConfig};
pub use model::Manifest;
pub use validate::{validate, validate_manifest};
