//! Repository search screen: a query box backed by a paged remote search.

use std::rc::Rc;

use futures::StreamExt;
use futures::future;
use futures::stream;
use serde::{Deserialize, Serialize};

use formwire_core::{Observable, Scheduler, Scope, current_scope, effect};

use crate::api::{Notice, RepositorySearch};
use crate::config::ValidationConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub name: String,
    pub url: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    #[default]
    Online,
    Offline,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResultState {
    pub repositories: Vec<Repository>,
    pub service_state: ServiceState,
    pub limit_exceeded: bool,
}

impl SearchResultState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn offline() -> Self {
        Self {
            service_state: ServiceState::Offline,
            ..Self::default()
        }
    }
}

pub struct SearchViewModel {
    pub results: Observable<SearchResultState>,
    pub notices: Observable<Notice>,
    scope: Scope,
}

impl SearchViewModel {
    /// Wires `query` to `search`: debounced, de-duplicated, newest query
    /// wins. An empty query shows nothing without a remote call; a failed
    /// search shows the empty state and ends that query.
    pub fn new(
        scheduler: &Scheduler,
        query: &Observable<String>,
        load_next_page: &Observable<()>,
        search: Rc<dyn RepositorySearch>,
        config: &ValidationConfig,
    ) -> Self {
        let scope = current_scope().map(|s| s.child()).unwrap_or_default();
        let notices = Observable::new();
        let load_next_page = load_next_page.clone();

        let results = scope.run(|| {
            Self::wire(scheduler, query, load_next_page, search, config, &notices)
        });

        Self {
            results,
            notices,
            scope,
        }
    }

    /// Tears down the subscriptions and cancels the running search.
    pub fn dispose(&self) {
        self.scope.dispose();
    }

    fn wire(
        scheduler: &Scheduler,
        query: &Observable<String>,
        load_next_page: Observable<()>,
        search: Rc<dyn RepositorySearch>,
        config: &ValidationConfig,
        notices: &Observable<Notice>,
    ) -> Observable<SearchResultState> {
        let results = query
            .debounce(scheduler, config.quiet_period)
            .distinct_until_changed()
            .flat_map_latest(scheduler, {
                let notices = notices.clone();
                move |query: &String| {
                    if query.is_empty() {
                        return stream::once(future::ready(SearchResultState::empty()))
                            .boxed_local();
                    }
                    let notices = notices.clone();
                    let query = query.clone();
                    search
                        .search(&query, load_next_page.clone())
                        .scan(false, move |failed, page| {
                            if *failed {
                                return future::ready(None);
                            }
                            let state = match page {
                                Ok(state) => state,
                                Err(e) => {
                                    log::debug!("search for {query:?} failed: {e}");
                                    if e.is_rate_limited() {
                                        notices.next(Notice::rate_limited());
                                    }
                                    *failed = true;
                                    SearchResultState::empty()
                                }
                            };
                            future::ready(Some(state))
                        })
                        .boxed_local()
                }
            });

        // A page flagged by the server counts as hitting the limit too.
        let limited = results.filter(|state| state.limit_exceeded);
        let _ = effect({
            let notices = notices.clone();
            move || {
                limited.subscribe_next(move |_| {
                    log::warn!("search rate limit exceeded");
                    notices.next(Notice::rate_limited());
                })
            }
        });

        results
    }
}
