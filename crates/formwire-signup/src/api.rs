//! Capabilities the form talks to. Implementations live outside this crate:
//! a real client in an app, an off-thread fake in the demo, harness mocks in
//! tests.

use futures::future::LocalBoxFuture;
use futures::stream::LocalBoxStream;

use formwire_core::Observable;

use crate::search::SearchResultState;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("The request timed out")]
    Timeout,
    #[error("Too many requests. Please wait a minute and try again")]
    RateLimited,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

impl ApiError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }
}

pub trait SignupApi {
    fn username_available(
        &self,
        username: &str,
    ) -> LocalBoxFuture<'static, Result<bool, ApiError>>;
    fn sign_up(
        &self,
        username: &str,
        password: &str,
    ) -> LocalBoxFuture<'static, Result<bool, ApiError>>;
}

pub trait RepositorySearch {
    /// Pages of results for `query`. Each value on `load_next_page` asks for
    /// one more page; every item is the accumulated state so far.
    fn search(
        &self,
        query: &str,
        load_next_page: Observable<()>,
    ) -> LocalBoxStream<'static, Result<SearchResultState, ApiError>>;
}

/// Where the form sends the user.
pub trait Wireframe {
    fn navigate_to_next_screen(&self);
    fn present_alert(&self, message: &str);
}

/// One-shot message for the user that is not tied to a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
}

impl Notice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn rate_limited() -> Self {
        Self::new("Exceeded the limit of unauthenticated requests. Please wait a minute.")
    }
}
