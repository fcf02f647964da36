use thiserror::Error;

/// Failures that stop the engine loop.
///
/// Loss and duplication are absorbed by retries and never surface here, and
/// unrecognized guarantee tags are reported to the producer as notifications.
#[derive(Debug, Error)]
pub enum EngineError<E>
where
    E: std::error::Error + 'static,
{
    /// The transport could not deliver the next inbound event.
    #[error("transport error: {0}")]
    Transport(#[source] E),
}
