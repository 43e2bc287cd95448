//! StreamSource trait - producer abstraction
//!
//! Decouples the ingest queue from the concrete delivery mechanism (a media
//! pipeline callback, a replay file, a synthetic generator). Sources call
//! back from their own delivery thread.

use std::sync::Arc;

use crate::Payload;

/// Event delivered by a source
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A decoded sample with its presentation timestamp (negative = unknown)
    Sample { raw_timestamp: f64, payload: Payload },

    /// Negotiated capability string, e.g. `image/jpeg, framerate=(fraction)4/1`
    Caps(String),
}

/// Source callback type
///
/// Uses `Arc` so one callback can be shared by the source's worker threads.
pub type SourceCallback = Arc<dyn Fn(SourceEvent) + Send + Sync>;

/// Stream source trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn StreamSource> = open_source("video-left");
/// source.listen(Arc::new(|event| {
///     if let SourceEvent::Sample { raw_timestamp, .. } = event {
///         println!("pts {raw_timestamp:.3}");
///     }
/// }));
/// // ...
/// source.stop();
/// ```
pub trait StreamSource: Send + Sync {
    /// Logical stream id produced by this source
    fn stream_id(&self) -> &str;

    /// Start delivering events; repeated calls are idempotent
    fn listen(&self, callback: SourceCallback);

    /// Stop delivering events
    fn stop(&self);

    /// Whether the source is currently delivering
    fn is_listening(&self) -> bool;
}
