use std::rc::Rc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use formwire_core::prelude::*;
use formwire_navigation::Navigator;
use formwire_signup::*;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
enum Screen {
    Signup,
    Welcome,
}

/// Answers on a worker thread after `latency`, like a real client would.
struct FakeApi {
    latency: Duration,
}

impl FakeApi {
    fn answer(
        &self,
        f: impl FnOnce() -> Result<bool, ApiError> + Send + 'static,
    ) -> LocalBoxFuture<'static, Result<bool, ApiError>> {
        let (tx, rx) = oneshot::channel();
        let latency = self.latency;
        thread::spawn(move || {
            thread::sleep(latency);
            let _ = tx.send(f());
        });
        rx.map(|answer| {
            answer.unwrap_or_else(|_| Err(ApiError::Network("worker went away".into())))
        })
        .boxed_local()
    }
}

impl SignupApi for FakeApi {
    fn username_available(
        &self,
        username: &str,
    ) -> LocalBoxFuture<'static, Result<bool, ApiError>> {
        let username = username.to_owned();
        self.answer(move || match username.as_str() {
            "ratelimit" => Err(ApiError::RateLimited),
            "admin" | "root" => Ok(false),
            _ => Ok(true),
        })
    }

    fn sign_up(
        &self,
        username: &str,
        _password: &str,
    ) -> LocalBoxFuture<'static, Result<bool, ApiError>> {
        let username = username.to_owned();
        self.answer(move || Ok(username != "admin"))
    }
}

struct NavigatorWireframe {
    navigator: Navigator<Screen>,
}

impl Wireframe for NavigatorWireframe {
    fn navigate_to_next_screen(&self) {
        self.navigator.push(Screen::Welcome);
    }

    fn present_alert(&self, message: &str) {
        println!("alert: {message}");
    }
}

/// Schedules one keystroke every `per_key` ticks from `start`; returns the
/// tick after the last one.
fn type_text(
    scheduler: &Scheduler,
    field: &Observable<String>,
    text: &str,
    start: Tick,
    per_key: Tick,
) -> Tick {
    let mut at = start;
    for (i, _) in text.char_indices().skip(1).chain([(text.len(), ' ')]) {
        let field = field.clone();
        let typed = text[..i].to_owned();
        let _ = scheduler.schedule_at(at, move || field.next(typed));
        at += per_key;
    }
    at
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config {path}"))?;
            ValidationConfig::from_json(&text).with_context(|| format!("parsing config {path}"))?
        }
        None => ValidationConfig::default(),
    };
    log::debug!("config: {}", config.to_json());

    let scheduler = Scheduler::system(Duration::from_millis(10));
    let navigator = Navigator::new(Screen::Signup);
    let inputs = SignupInputs::default();

    let signup_entry = navigator
        .stack
        .top()
        .context("navigator starts with the signup screen")?;
    let vm = signup_entry.scope.run(|| {
        SignupViewModel::new(
            inputs.clone(),
            &scheduler,
            Rc::new(FakeApi {
                latency: Duration::from_millis(120),
            }),
            Rc::new(NavigatorWireframe {
                navigator: navigator.clone(),
            }),
            config.clone(),
        )
    });

    let subs = Dispose::all([
        vm.validated_username.subscribe_next(|r| println!("username: {r:?}")),
        vm.validated_password.subscribe_next(|r| println!("password: {r:?}")),
        vm.validated_repeated_password.subscribe_next(|r| println!("repeated: {r:?}")),
        vm.can_submit.observe(|ok| println!("can submit: {ok}")),
        vm.signing_in.subscribe_next(|busy| println!("signing in: {busy}")),
        vm.submit_outcome.subscribe_next(|o| println!("outcome: {o:?}")),
        vm.notices.subscribe_next(|n| println!("notice: {}", n.message)),
        navigator.stack.version().subscribe_next({
            let navigator = navigator.clone();
            move |_| println!("screen: {:?}", navigator.top_key())
        }),
    ]);

    // 5 ticks (50 ms) per key; pauses longer than the quiet period trigger
    // a username check.
    let t = type_text(&scheduler, &inputs.username, "admin", 0, 5);
    let t = type_text(&scheduler, &inputs.username, "alice", t + 60, 5);
    let t = type_text(&scheduler, &inputs.password, "hunter22", t + 10, 5);
    let t = type_text(&scheduler, &inputs.repeated_password, "hunter22", t + 10, 5);
    for at in [t + 40, t + 41] {
        let taps = inputs.submit_taps.clone();
        let _ = scheduler.schedule_at(at, move || taps.next(()));
    }

    scheduler.run();

    println!("back stack: {}", navigator.stack.to_json()?);
    // Back out of the welcome screen; the signup entry and its view-model
    // stay alive until the demo tears them down.
    navigator.pop();
    subs.run();
    vm.dispose();
    Ok(())
}
