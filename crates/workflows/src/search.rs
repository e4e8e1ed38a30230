//! Search-as-you-type over a [`PackageSearch`] backend.
//!
//! Every query change halts the request in flight before starting the next,
//! so at most one request is live per instance and a stale response can
//! never be rendered.

use std::{cell::RefCell, rc::Rc, time::Duration};

use enact_core::{mount_child, render, Element, EventKind, Scope, Task, UiEvent, UiNode, Value};
use futures::StreamExt;
use search_client::PackageSearch;
use shared::domain::PackageSummary;
use tokio::time::sleep;
use tracing::{debug, warn};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

const EMPTY_PROMPT: &str = "Enter a keyword to search for packages on NPM.";

#[derive(Clone)]
pub struct SearchProps {
    pub query: Option<String>,
    pub client: Rc<dyn PackageSearch>,
    pub debounce: Duration,
}

#[derive(Clone)]
pub struct ResultsProps {
    pub query: Value<Option<String>>,
    pub client: Rc<dyn PackageSearch>,
    pub debounce: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Empty,
    Loading {
        query: String,
        previous: Rc<[PackageSummary]>,
    },
    Loaded {
        query: String,
        packages: Rc<[PackageSummary]>,
    },
    Failed {
        query: String,
        message: String,
    },
}

impl SearchState {
    pub fn view(&self) -> UiNode {
        match self {
            Self::Empty => Element::new("p").child(EMPTY_PROMPT).into(),
            Self::Loading { query, previous } => {
                let status = Element::new("p").child(format!("Loading results for {query}..."));
                if previous.is_empty() {
                    status.into()
                } else {
                    UiNode::fragment([UiNode::from(status), package_list(previous)])
                }
            }
            Self::Loaded { packages, .. } => package_list(packages),
            Self::Failed { message, .. } => Element::new("details")
                .child(Element::new("summary").child("Something went wrong!"))
                .child(Element::new("p").child(message.as_str()))
                .into(),
        }
    }
}

fn package_list(packages: &[PackageSummary]) -> UiNode {
    if packages.is_empty() {
        return Element::new("p").child("No results").into();
    }
    Element::new("ul")
        .children(packages.iter().map(|package| {
            let mut link = Element::new("a").attr("target", "_blank");
            if let Some(href) = &package.npm_url {
                link = link.attr("href", href.as_str());
            }
            Element::new("li")
                .attr("key", package.name.as_str())
                .child(
                    Element::new("h3")
                        .attr("class", "package-name")
                        .child(link.child(package.name.as_str()))
                        .child(" ")
                        .child(
                            Element::new("small")
                                .attr("class", "package-version")
                                .child(format!("({})", package.version)),
                        ),
                )
                .child(
                    Element::new("p")
                        .attr("class", "package-description")
                        .child(package.description.clone().unwrap_or_default()),
                )
        }))
        .into()
}

/// Input box bound to a query cell, followed by the results for it.
pub async fn search(scope: Scope, props: SearchProps) -> anyhow::Result<Option<UiNode>> {
    let query = Value::new(props.query.clone());
    let results = mount_child(
        &scope,
        search_results,
        ResultsProps {
            query: query.clone(),
            client: props.client,
            debounce: props.debounce,
        },
    )?;

    let input = Element::new("input")
        .attr("id", "query")
        .attr("value", props.query.unwrap_or_default())
        .on(EventKind::Input, move |event| {
            if let UiEvent::Input(text) = event {
                query.set(Some(text.clone()));
            }
        });
    Ok(Some(Element::new("div").child(input).child(results.node()).into()))
}

/// Renders the state of the search for the current query.
pub async fn search_results(scope: Scope, props: ResultsProps) -> anyhow::Result<Option<UiNode>> {
    let ResultsProps {
        query,
        client,
        debounce,
    } = props;
    let cache: Rc<RefCell<Rc<[PackageSummary]>>> = Rc::new(RefCell::new(Rc::from(Vec::new())));
    let mut in_flight: Option<Task<()>> = None;

    let mut queries = query.subscribe(&scope)?;
    while let Some(next) = queries.next().await {
        if let Some(task) = in_flight.take() {
            if let Err(err) = task.halt().await {
                warn!(error = %err, "previous search did not stop cleanly");
            }
        }

        let Some(q) = next.filter(|q| !q.trim().is_empty()) else {
            *cache.borrow_mut() = Rc::from(Vec::new());
            render(&scope, SearchState::Empty.view())?;
            continue;
        };

        let client = Rc::clone(&client);
        let cache = Rc::clone(&cache);
        in_flight = Some(scope.spawn(move |scope| run_search(scope, q, client, debounce, cache))?);
    }
    Ok(None)
}

async fn run_search(
    scope: Scope,
    query: String,
    client: Rc<dyn PackageSearch>,
    debounce: Duration,
    cache: Rc<RefCell<Rc<[PackageSummary]>>>,
) -> anyhow::Result<()> {
    let previous = cache.borrow().clone();
    render(
        &scope,
        SearchState::Loading {
            query: query.clone(),
            previous,
        }
        .view(),
    )?;
    sleep(debounce).await;

    debug!(%query, "searching packages");
    let state = match client.search(&query).await {
        Ok(packages) => {
            let packages: Rc<[PackageSummary]> = packages.into();
            *cache.borrow_mut() = Rc::clone(&packages);
            SearchState::Loaded { query, packages }
        }
        Err(err) => {
            warn!(%query, error = %err, "package search failed");
            SearchState::Failed {
                query,
                message: err.to_string(),
            }
        }
    };
    render(&scope, state.view())?;
    Ok(())
}
