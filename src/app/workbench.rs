//! Workbench - expands variables, dispatches, and records history

use std::collections::BTreeMap;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{format_body, HistoryEntry, NewHistoryEntry, RequestSpec, ResponseRecord};
use crate::network::Dispatcher;
use crate::storage::Store;
use crate::variables::{expand, expand_opt, unresolved_tokens, EnvironmentSelection};

use super::draft::{parse_headers, RequestDraft};

/// Outcome of a request that reached the network and got a response
#[derive(Clone, Debug)]
pub struct Execution {
    /// The request as actually sent, variables expanded
    pub request: RequestSpec,
    pub response: ResponseRecord,
    /// Pretty-printed when the body is JSON
    pub formatted_body: String,
    pub history_id: i64,
}

/// Entry point for presentation layers. Cheap to clone; clones share the
/// store and the connection pool, so concurrent calls are independent.
#[derive(Clone, Debug)]
pub struct Workbench {
    store: Store,
    dispatcher: Dispatcher,
    default_timeout: u64,
    history_limit: usize,
}

impl Workbench {
    pub fn new(store: Store, dispatcher: Dispatcher, config: &Config) -> Self {
        Workbench {
            store,
            dispatcher,
            default_timeout: config.timeout_seconds,
            history_limit: config.history_limit,
        }
    }

    /// Open the configured database and build a dispatcher
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = Store::open(&config.database_path)?;
        let dispatcher = Dispatcher::new(&config.user_agent);
        Ok(Self::new(store, dispatcher, config))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run a storage call off the async reactor. Presentation layers use
    /// this for anything that touches the store directly.
    pub async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(&store))
            .await
            .map_err(|e| Error::StoreUnavailable(format!("storage task failed: {}", e)))?
    }

    /// Expand, validate, send, and record one request.
    ///
    /// Validation failures, network failures and timeouts return before
    /// anything is written, so history only holds requests that got a
    /// response.
    pub async fn execute_request(
        &self,
        draft: &RequestDraft,
        selection: &EnvironmentSelection,
    ) -> Result<Execution> {
        if draft.url.trim().is_empty() {
            return Err(Error::validation("missing url"));
        }

        let selection = selection.clone();
        let variables = self
            .with_store(move |store| store.resolve_variables(&selection))
            .await?;

        let url = expand(draft.url.trim(), &variables);
        let headers_text = expand(&draft.headers, &variables);
        let body = expand_opt(draft.body.as_deref().filter(|b| !b.is_empty()), &variables);
        let params = draft.params.as_ref().map(|params| {
            params
                .iter()
                .map(|(k, v)| (k.clone(), expand(v, &variables)))
                .collect::<BTreeMap<_, _>>()
        });

        for (field, tokens) in leftover_tokens(&url, &headers_text, body.as_deref()) {
            tracing::warn!(field = field, tokens = ?tokens, "Unresolved variables");
        }

        let headers = parse_headers(&headers_text)?;

        let request = RequestSpec {
            method: draft.method.trim().to_uppercase(),
            url,
            headers,
            body,
            params,
            timeout_seconds: draft.timeout_seconds.unwrap_or(self.default_timeout),
        };
        let response = self.dispatcher.execute(&request).await?;

        let formatted_body = format_body(&response.body_text);
        let entry = NewHistoryEntry {
            method: request.method.clone(),
            url: request.url.clone(),
            headers: Some(serde_json::to_string(&request.headers)?),
            body: request.body.clone(),
            response_code: Some(response.status_code),
            response_body: Some(formatted_body.clone()),
        };
        let history_id = self
            .with_store(move |store| store.add_to_history(&entry))
            .await?;

        Ok(Execution {
            request,
            response,
            formatted_body,
            history_id,
        })
    }

    /// Send a past request again; the new run gets its own history entry
    pub async fn rerun_history(
        &self,
        history_id: i64,
        selection: &EnvironmentSelection,
    ) -> Result<Execution> {
        let entry = self
            .with_store(move |store| store.get_history_entry(history_id))
            .await?
            .ok_or(Error::NotFound {
                kind: "history entry",
                id: history_id,
            })?;
        self.execute_request(&RequestDraft::from(&entry), selection)
            .await
    }

    /// The configured number of most recent history entries
    pub async fn recent_history(&self) -> Result<Vec<HistoryEntry>> {
        let limit = self.history_limit;
        self.with_store(move |store| store.get_history(limit)).await
    }
}

/// Tokens still present after expansion, per request field
fn leftover_tokens(
    url: &str,
    headers: &str,
    body: Option<&str>,
) -> Vec<(&'static str, Vec<String>)> {
    [
        ("url", url),
        ("headers", headers),
        ("body", body.unwrap_or_default()),
    ]
    .into_iter()
    .map(|(field, text)| (field, unresolved_tokens(text)))
    .filter(|(_, tokens)| !tokens.is_empty())
    .collect()
}
