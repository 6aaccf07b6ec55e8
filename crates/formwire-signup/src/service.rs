use std::rc::Rc;
use std::time::Duration;

use futures::future::{self, Either, LocalBoxFuture};
use futures::stream::{self, LocalBoxStream};
use futures::{FutureExt, StreamExt};

use formwire_core::{Observable, Scheduler};

use crate::api::{ApiError, Notice, SignupApi};
use crate::config::ValidationConfig;
use crate::validation::{UsernameCheck, ValidationResult, username_availability, validate_username};

/// Resolves `call`, or fails with [`ApiError::Timeout`] once `timeout` has
/// passed on `scheduler`'s clock. The losing side is dropped.
pub async fn with_timeout<T>(
    scheduler: Scheduler,
    timeout: Duration,
    call: LocalBoxFuture<'static, Result<T, ApiError>>,
) -> Result<T, ApiError> {
    let deadline = scheduler.sleep_for(timeout);
    match future::select(call, deadline).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(ApiError::Timeout),
    }
}

/// Turns raw username input into field states, asking the remote API
/// whether a name is free.
#[derive(Clone)]
pub struct ValidationService {
    api: Rc<dyn SignupApi>,
    scheduler: Scheduler,
    config: ValidationConfig,
    notices: Observable<Notice>,
}

impl ValidationService {
    pub fn new(api: Rc<dyn SignupApi>, scheduler: Scheduler, config: ValidationConfig) -> Self {
        Self {
            api,
            scheduler,
            config,
            notices: Observable::new(),
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Rate-limit notices raised by remote checks.
    pub fn notices(&self) -> Observable<Notice> {
        self.notices.clone()
    }

    /// Debounced, de-duplicated username states. A newer name cancels the
    /// check still running for an older one.
    pub fn validated_usernames(&self, input: &Observable<String>) -> Observable<ValidationResult> {
        self.checked_usernames(input).map(|(_, result)| result.clone())
    }

    /// Same states as [`validated_usernames`](Self::validated_usernames),
    /// each paired with the name it was computed for.
    pub fn checked_usernames(
        &self,
        input: &Observable<String>,
    ) -> Observable<(String, ValidationResult)> {
        let this = self.clone();
        input
            .debounce(&self.scheduler, self.config.quiet_period)
            .distinct_until_changed()
            .flat_map_latest(&self.scheduler, move |name: &String| {
                let name = name.clone();
                this.check_username(&name)
                    .map(move |result| (name.clone(), result))
                    .boxed_local()
            })
    }

    /// States for a single name: settled locally, or `Validating` followed by
    /// the remote answer.
    pub fn check_username(&self, name: &str) -> LocalBoxStream<'static, ValidationResult> {
        match validate_username(&self.config, name) {
            UsernameCheck::Settled(result) => stream::once(future::ready(result)).boxed_local(),
            UsernameCheck::NeedsRemoteCheck => {
                let remote = self.remote_check(name.to_owned());
                stream::once(future::ready(ValidationResult::Validating))
                    .chain(stream::once(remote))
                    .boxed_local()
            }
        }
    }

    fn remote_check(&self, name: String) -> LocalBoxFuture<'static, ValidationResult> {
        let api = self.api.clone();
        let scheduler = self.scheduler.clone();
        let timeout = self.config.request_timeout;
        let notices = self.notices.clone();
        async move {
            log::trace!("username check for {name:?} at tick {}", scheduler.now());
            let call = api.username_available(&name);
            let answer = with_timeout(scheduler, timeout, call).await;
            match &answer {
                Err(ApiError::RateLimited) => {
                    log::warn!("username check rate limited");
                    notices.next(Notice::rate_limited());
                }
                Err(e) => log::debug!("username check for {name:?} failed: {e}"),
                Ok(_) => {}
            }
            username_availability(&answer)
        }
        .boxed_local()
    }
}
