use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use formwire_core::{
    Observable, Scheduler, Scope, TaskHandle, combine_latest2, combine_latest3, current_scope,
    effect,
};

use crate::api::{ApiError, Notice, SignupApi, Wireframe};
use crate::config::ValidationConfig;
use crate::service::{ValidationService, with_timeout};
use crate::validation::{ValidationResult, validate_password, validate_repeated_password};

pub const SIGN_UP_FAILED: &str = "Sign up failed";

/// Raw form input. The view-model only reads these.
#[derive(Clone, Default)]
pub struct SignupInputs {
    pub username: Observable<String>,
    pub password: Observable<String>,
    pub repeated_password: Observable<String>,
    pub submit_taps: Observable<()>,
}

/// What happened to one accepted submit press.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignupOutcome {
    SignedUp,
    Rejected,
    Failed(ApiError),
}

/// Everything the signup screen binds to.
pub struct SignupViewModel {
    pub validated_username: Observable<ValidationResult>,
    pub validated_password: Observable<ValidationResult>,
    pub validated_repeated_password: Observable<ValidationResult>,
    /// True only while every field is `Ok` for what is currently typed.
    /// Starts out false.
    pub can_submit: Observable<bool>,
    /// True while a sign-up call is in flight.
    pub signing_in: Observable<bool>,
    pub submit_outcome: Observable<SignupOutcome>,
    pub notices: Observable<Notice>,
    submit_requests: Observable<()>,
    in_flight: Rc<RefCell<Option<TaskHandle>>>,
    scope: Scope,
}

impl SignupViewModel {
    pub fn new(
        inputs: SignupInputs,
        scheduler: &Scheduler,
        api: Rc<dyn SignupApi>,
        wireframe: Rc<dyn Wireframe>,
        config: ValidationConfig,
    ) -> Self {
        let scope = current_scope().map(|s| s.child()).unwrap_or_default();
        let service = ValidationService::new(api.clone(), scheduler.clone(), config.clone());
        let submit_requests = Observable::new();
        let in_flight = Rc::new(RefCell::new(None));
        let signing_in = Observable::with_value(false);
        let submit_outcome = Observable::new();
        let notices = Observable::new();

        let (validated_username, validated_password, validated_repeated_password, can_submit) =
            scope.run(|| {
                let checked_username = service.checked_usernames(&inputs.username);
                let validated_username = checked_username.map(|(_, result)| result.clone());

                let validated_password = inputs
                    .password
                    .map({
                        let config = config.clone();
                        move |pw: &String| validate_password(&config, pw)
                    })
                    .distinct_until_changed();

                // Both password fields in one node, so a password change
                // never pairs a fresh password result with a stale
                // repeated-password result.
                let credentials = combine_latest2(&inputs.password, &inputs.repeated_password, {
                    let config = config.clone();
                    move |pw: &String, repeated: &String| {
                        (validate_password(&config, pw), validate_repeated_password(pw, repeated))
                    }
                });
                let validated_repeated_password = credentials
                    .map(|(_, repeated)| repeated.clone())
                    .distinct_until_changed();

                // A username result only counts while it belongs to the raw
                // input; a keystroke closes the gate before the debounced
                // check catches up.
                let can_submit = combine_latest3(
                    &inputs.username,
                    &checked_username,
                    &credentials,
                    |typed, (checked, user), (pw, repeated)| {
                        typed == checked && user.is_valid() && pw.is_valid() && repeated.is_valid()
                    },
                )
                .distinct_until_changed()
                .hold(false);

                let _ = effect({
                    let notices = notices.clone();
                    let service_notices = service.notices();
                    move || service_notices.subscribe_next(move |n| notices.next(n.clone()))
                });

                let submit = SubmitHandler {
                    scheduler: scheduler.clone(),
                    api,
                    wireframe,
                    timeout: config.request_timeout,
                    can_submit: can_submit.clone(),
                    username: inputs.username.clone(),
                    password: inputs.password.clone(),
                    in_flight: in_flight.clone(),
                    signing_in: signing_in.clone(),
                    outcomes: submit_outcome.clone(),
                    notices: notices.clone(),
                };
                let presses = inputs.submit_taps.merge(&submit_requests);
                let _ = effect(move || presses.subscribe_next(move |_| submit.on_press()));

                (validated_username, validated_password, validated_repeated_password, can_submit)
            });

        Self {
            validated_username,
            validated_password,
            validated_repeated_password,
            can_submit,
            signing_in,
            submit_outcome,
            notices,
            submit_requests,
            in_flight,
            scope,
        }
    }

    /// Same as a tap on the submit button.
    pub fn submit(&self) {
        self.submit_requests.next(());
    }

    pub fn is_signing_in(&self) -> bool {
        self.in_flight.borrow().is_some()
    }

    /// Unsubscribes from the inputs, cancels the username check and aborts
    /// a sign-up call that is still in flight.
    pub fn dispose(&self) {
        self.scope.dispose();
        let task = self.in_flight.borrow_mut().take();
        if let Some(task) = task {
            log::debug!("sign up aborted by dispose");
            task.abort();
            self.signing_in.next(false);
        }
    }
}

struct SubmitHandler {
    scheduler: Scheduler,
    api: Rc<dyn SignupApi>,
    wireframe: Rc<dyn Wireframe>,
    timeout: Duration,
    can_submit: Observable<bool>,
    username: Observable<String>,
    password: Observable<String>,
    in_flight: Rc<RefCell<Option<TaskHandle>>>,
    signing_in: Observable<bool>,
    outcomes: Observable<SignupOutcome>,
    notices: Observable<Notice>,
}

impl SubmitHandler {
    fn on_press(&self) {
        if self.can_submit.latest() != Some(true) {
            log::debug!("submit ignored: form is not valid");
            return;
        }
        if self.in_flight.borrow().is_some() {
            log::debug!("submit ignored: sign up already in flight");
            return;
        }
        let username = self.username.latest().unwrap_or_default();
        let password = self.password.latest().unwrap_or_default();

        let call = self.api.sign_up(&username, &password);
        let task = self.scheduler.spawn({
            let scheduler = self.scheduler.clone();
            let timeout = self.timeout;
            let wireframe = self.wireframe.clone();
            let in_flight = self.in_flight.clone();
            let signing_in = self.signing_in.clone();
            let outcomes = self.outcomes.clone();
            let notices = self.notices.clone();
            async move {
                let result = with_timeout(scheduler, timeout, call).await;
                // Release the slot before anyone downstream can press again.
                let own = in_flight.borrow_mut().take();
                drop(own);
                signing_in.next(false);

                let outcome = match result {
                    Ok(true) => {
                        log::debug!("signed up as {username:?}");
                        wireframe.navigate_to_next_screen();
                        SignupOutcome::SignedUp
                    }
                    Ok(false) => {
                        wireframe.present_alert(SIGN_UP_FAILED);
                        SignupOutcome::Rejected
                    }
                    Err(e) => {
                        if e.is_rate_limited() {
                            log::warn!("sign up rate limited");
                            notices.next(Notice::rate_limited());
                        }
                        wireframe.present_alert(&e.to_string());
                        SignupOutcome::Failed(e)
                    }
                };
                outcomes.next(outcome);
            }
        });
        *self.in_flight.borrow_mut() = Some(task);
        self.signing_in.next(true);
    }
}
