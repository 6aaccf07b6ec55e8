/// Error carried by an [`Event::Error`](crate::Event::Error).
///
/// Streams built by the form never emit one; it exists so scripted inputs and
/// recorders can represent a failing upstream.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StreamError {
    message: String,
}

impl StreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
