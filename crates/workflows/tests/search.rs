use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    time::Duration,
};

use async_trait::async_trait;
use enact_core::{MountHandle, ScopeManager, UiEvent, Value};
use search_client::{PackageSearch, SearchError};
use shared::{domain::PackageSummary, error::ApiError};
use tokio::{task::LocalSet, time::sleep};
use workflows::{search, search_results, ResultsProps, SearchProps, SearchState};

const DEBOUNCE: Duration = Duration::from_millis(10);
const LATENCY: Duration = Duration::from_millis(50);

#[derive(Default)]
struct FakeSearch {
    calls: RefCell<Vec<String>>,
    in_flight: Cell<usize>,
    max_in_flight: Cell<usize>,
}

struct InFlight<'a>(&'a Cell<usize>);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

#[async_trait(?Send)]
impl PackageSearch for FakeSearch {
    async fn search(&self, query: &str) -> Result<Vec<PackageSummary>, SearchError> {
        self.calls.borrow_mut().push(query.to_owned());
        self.in_flight.set(self.in_flight.get() + 1);
        self.max_in_flight
            .set(self.max_in_flight.get().max(self.in_flight.get()));
        let _guard = InFlight(&self.in_flight);
        sleep(LATENCY).await;

        match query {
            "broken" => Err(ApiError::new(503, "upstream unavailable").into()),
            "nothing" => Ok(Vec::new()),
            _ => Ok(vec![PackageSummary {
                name: format!("{query}-core"),
                version: "1.0.0".into(),
                description: Some(format!("all about {query}")),
                npm_url: Some(format!("https://www.npmjs.com/package/{query}-core")),
            }]),
        }
    }
}

async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn mount_results(
    manager: &ScopeManager,
    backend: &Rc<FakeSearch>,
) -> (MountHandle<ResultsProps>, Value<Option<String>>) {
    let query = Value::new(None);
    let (handle, _task) = manager
        .mount(
            search_results,
            ResultsProps {
                query: query.clone(),
                client: backend.clone(),
                debounce: DEBOUNCE,
            },
        )
        .expect("mount results");
    (handle, query)
}

#[test]
fn empty_state_prompts_for_a_keyword() {
    assert_eq!(
        SearchState::Empty.view().markup(),
        "<p>Enter a keyword to search for packages on NPM.</p>"
    );
    assert_eq!(
        SearchState::Loaded {
            query: "x".into(),
            packages: Rc::from(Vec::new()),
        }
        .view()
        .text_content(),
        "No results"
    );
}

#[tokio::test(start_paused = true)]
async fn loaded_results_render_each_package() {
    LocalSet::new()
        .run_until(async {
            let backend = Rc::new(FakeSearch::default());
            let manager = ScopeManager::new();
            let (handle, query) = mount_results(&manager, &backend);
            settle().await;
            assert_eq!(handle.slot().text(), "Enter a keyword to search for packages on NPM.");

            query.set(Some("tokio".into()));
            settle().await;
            assert_eq!(handle.slot().text(), "Loading results for tokio...");

            sleep(DEBOUNCE + LATENCY + Duration::from_millis(5)).await;
            let markup = handle.slot().markup();
            assert!(markup.contains("<a target=\"_blank\" href=\"https://www.npmjs.com/package/tokio-core\">tokio-core</a>"));
            assert!(markup.contains("<small class=\"package-version\">(1.0.0)</small>"));
            assert!(markup.contains("all about tokio"));
            assert_eq!(*backend.calls.borrow(), ["tokio"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn instances_keep_separate_result_caches() {
    LocalSet::new()
        .run_until(async {
            let backend = Rc::new(FakeSearch::default());
            let manager = ScopeManager::new();
            let (first, first_query) = mount_results(&manager, &backend);
            let (second, second_query) = mount_results(&manager, &backend);

            first_query.set(Some("alpha".into()));
            sleep(DEBOUNCE + LATENCY + Duration::from_millis(5)).await;
            assert!(first.slot().text().contains("alpha-core"));

            second_query.set(Some("beta".into()));
            settle().await;
            assert_eq!(second.slot().text(), "Loading results for beta...");
            assert!(!second.slot().markup().contains("alpha-core"));
            assert!(first.slot().text().contains("alpha-core"));

            sleep(DEBOUNCE + LATENCY + Duration::from_millis(5)).await;
            assert!(second.slot().text().contains("beta-core"));
            assert!(!second.slot().text().contains("alpha-core"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn new_query_halts_the_request_in_flight() {
    LocalSet::new()
        .run_until(async {
            let backend = Rc::new(FakeSearch::default());
            let manager = ScopeManager::new();
            let (handle, query) = mount_results(&manager, &backend);
            settle().await;

            query.set(Some("q1".into()));
            sleep(DEBOUNCE + Duration::from_millis(5)).await;
            assert_eq!(backend.in_flight.get(), 1);

            query.set(Some("q2".into()));
            sleep(DEBOUNCE + LATENCY + Duration::from_millis(5)).await;

            assert_eq!(*backend.calls.borrow(), ["q1", "q2"]);
            assert_eq!(backend.max_in_flight.get(), 1);
            assert_eq!(backend.in_flight.get(), 0);
            let text = handle.slot().text();
            assert!(text.contains("q2-core"), "{text}");
            assert!(!text.contains("q1-core"), "{text}");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn only_the_last_of_rapid_queries_is_requested() {
    LocalSet::new()
        .run_until(async {
            let backend = Rc::new(FakeSearch::default());
            let manager = ScopeManager::new();
            let (handle, query) = mount_results(&manager, &backend);
            settle().await;

            for q in ["r", "re", "rea"] {
                query.set(Some(q.into()));
                settle().await;
            }
            sleep(DEBOUNCE + LATENCY + Duration::from_millis(5)).await;

            assert_eq!(*backend.calls.borrow(), ["rea"]);
            assert!(handle.slot().text().starts_with("rea-core"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn blank_query_clears_results_and_cancels_the_request() {
    LocalSet::new()
        .run_until(async {
            let backend = Rc::new(FakeSearch::default());
            let manager = ScopeManager::new();
            let (handle, query) = mount_results(&manager, &backend);
            settle().await;

            query.set(Some("tokio".into()));
            sleep(DEBOUNCE + Duration::from_millis(5)).await;
            assert_eq!(backend.in_flight.get(), 1);

            query.set(Some("   ".into()));
            settle().await;
            assert_eq!(backend.in_flight.get(), 0);
            assert_eq!(handle.slot().text(), "Enter a keyword to search for packages on NPM.");

            sleep(LATENCY * 2).await;
            assert_eq!(handle.slot().text(), "Enter a keyword to search for packages on NPM.");
            assert_eq!(*backend.calls.borrow(), ["tokio"]);
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn loading_keeps_showing_previous_results() {
    LocalSet::new()
        .run_until(async {
            let backend = Rc::new(FakeSearch::default());
            let manager = ScopeManager::new();
            let (handle, query) = mount_results(&manager, &backend);
            query.set(Some("serde".into()));
            sleep(DEBOUNCE + LATENCY + Duration::from_millis(5)).await;

            query.set(Some("serde_json".into()));
            settle().await;
            let text = handle.slot().text();
            assert!(text.starts_with("Loading results for serde_json..."), "{text}");
            assert!(text.contains("serde-core"), "{text}");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn failed_search_shows_the_error_inline() {
    LocalSet::new()
        .run_until(async {
            let backend = Rc::new(FakeSearch::default());
            let manager = ScopeManager::new();
            let (handle, query) = mount_results(&manager, &backend);
            query.set(Some("broken".into()));
            sleep(DEBOUNCE + LATENCY + Duration::from_millis(5)).await;

            assert_eq!(
                handle.slot().markup(),
                "<details><summary>Something went wrong!</summary><p>upstream unavailable</p></details>"
            );
            assert!(handle.scope().is_some_and(|scope| scope.is_alive()));

            query.set(Some("nothing".into()));
            sleep(DEBOUNCE + LATENCY + Duration::from_millis(5)).await;
            assert_eq!(handle.slot().text(), "No results");
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn typing_into_the_input_drives_the_results() {
    LocalSet::new()
        .run_until(async {
            let backend = Rc::new(FakeSearch::default());
            let manager = ScopeManager::new();
            let (handle, task) = manager
                .mount(
                    search,
                    SearchProps {
                        query: None,
                        client: backend.clone(),
                        debounce: DEBOUNCE,
                    },
                )
                .expect("mount search");
            task.join().await.expect("search body");
            settle().await;
            assert!(handle.slot().markup().starts_with("<div><input id=\"query\" value></input><p>Enter"));

            assert!(handle.slot().dispatch("query", &UiEvent::Input("axum".into())));
            sleep(DEBOUNCE + LATENCY + Duration::from_millis(5)).await;

            assert!(handle.slot().text().contains("axum-core"));
            assert_eq!(*backend.calls.borrow(), ["axum"]);
        })
        .await;
}
