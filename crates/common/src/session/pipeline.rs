use chrono::Utc;
use futures::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument};

use super::{SearchSession, SessionRegistry, StageOutcome};
use crate::config::{AppConfig, Preferences};
use crate::context::{AnswerSynthesizer, QueryRefiner, Refiner, SynthesisRequest, Synthesizer};
use crate::errors::Result;
use crate::metrics::record_synthesis;
use crate::search::{SearchMode, SearchProvider, SearchQuery, SerperClient};

/// Runs refine, search and synthesis for the current query.
///
/// Submitting a new query supersedes the previous session: its task is
/// aborted and any write it still attempts is discarded.
pub struct SearchPipeline {
    refiner: Arc<dyn QueryRefiner>,
    provider: Arc<dyn SearchProvider>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    registry: SessionRegistry,
    preferences: Preferences,
    active: Mutex<Option<(SearchSession, JoinHandle<()>)>>,
}

impl SearchPipeline {
    pub fn new(
        refiner: Arc<dyn QueryRefiner>,
        provider: Arc<dyn SearchProvider>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        preferences: Preferences,
    ) -> Self {
        Self {
            refiner,
            provider,
            synthesizer,
            registry: SessionRegistry::new(),
            preferences,
            active: Mutex::new(None),
        }
    }

    /// Pipeline wired to the Serper and DeepSeek clients.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            Arc::new(Refiner::new(&config.refiner)?),
            Arc::new(SerperClient::new(&config.search)?),
            Arc::new(Synthesizer::new(&config.reasoning)?),
            config.preferences.clone(),
        ))
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    /// Start a session for `text`. Must be called inside a Tokio runtime.
    pub fn submit(&self, text: &str, mode: SearchMode) -> Result<SearchSession> {
        let query = SearchQuery::new(text, mode)?;
        let session = self.registry.begin(query, &self.preferences);

        let span = tracing::info_span!(
            "search_session",
            id = %session.id(),
            generation = session.generation(),
            mode = %mode
        );
        let task = tokio::spawn(
            run(
                session.clone(),
                Arc::clone(&self.refiner),
                Arc::clone(&self.provider),
                Arc::clone(&self.synthesizer),
            )
            .instrument(span),
        );

        let previous = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace((session.clone(), task));
        if let Some((old, handle)) = previous {
            debug!(generation = old.generation(), "Aborting superseded session");
            handle.abort();
        }

        Ok(session)
    }

    /// The most recently submitted session
    pub fn current(&self) -> Option<SearchSession> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|(session, _)| session.clone())
    }

    /// Wait for the current session's task to finish.
    pub async fn wait(&self) {
        let handle = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
            .map(|(_, handle)| std::mem::replace(handle, tokio::spawn(async {})));
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run(
    session: SearchSession,
    refiner: Arc<dyn QueryRefiner>,
    provider: Arc<dyn SearchProvider>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
) {
    let query = session.query().clone();
    let mode = query.mode;
    let as_of = Utc::now().date_naive();

    // Search uses the raw query, so both can run at once. Each stage lands
    // in the session as soon as it resolves.
    let refine = async {
        let refinement = refiner.refine(&query.text, mode.as_str(), as_of).await;
        if let Err(e) = &refinement {
            warn!(error = %e, "Continuing without refinement");
        }
        session.set_refinement(refinement.into());
    };
    let search = async {
        match provider.search(&query.text, mode).await {
            Ok(results) => session
                .set_results(StageOutcome::Ready(results.clone()))
                .then_some(results),
            Err(e) => {
                warn!(error = %e, "Search failed");
                session.set_results(StageOutcome::Failed(e.to_string()));
                None
            }
        }
    };
    let ((), results) = tokio::join!(refine, search);

    let Some(results) = results else {
        return;
    };
    let count = results.result_count();
    if count == 0 {
        info!("No results, skipping synthesis");
        return;
    }

    let request = SynthesisRequest {
        query: query.text.clone(),
        mode: mode.to_string(),
        results,
        refinement: session.refinement(),
        as_of,
    };
    if !session.begin_streaming() {
        return;
    }

    let start = Instant::now();
    let mut stream = match synthesizer.synthesize(&request).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "Synthesis failed before any data");
            session.fail(e.to_string());
            return;
        }
    };

    while let Some(item) = stream.next().await {
        match item {
            Ok(chunk) => {
                if !session.append(&chunk) {
                    debug!("Session superseded, dropping answer stream");
                    return;
                }
            }
            Err(e) => {
                warn!(error = %e, "Answer stream interrupted");
                record_synthesis(start.elapsed().as_secs_f64(), "interrupted");
                session.fail(e.to_string());
                return;
            }
        }
    }

    if session.complete() {
        record_synthesis(start.elapsed().as_secs_f64(), "complete");
        info!(latency_ms = start.elapsed().as_millis() as u64, "Answer complete");
    }
}
