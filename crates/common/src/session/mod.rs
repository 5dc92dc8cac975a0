//! Search sessions
//!
//! One session holds everything produced for one submitted query. A
//! process-wide generation counter decides which session is current;
//! every write checks it, so a superseded session never changes again.

mod citations;
mod pipeline;

pub use citations::{extract_citations, Citation};
pub use pipeline::SearchPipeline;

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use crate::config::Preferences;
use crate::context::RefinementResult;
use crate::search::{search_id, SearchQuery, SearchResponse};
use crate::stream::{StreamAccumulator, StreamChunk};

/// Progress of the answer stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "lowercase")]
pub enum SynthesisStatus {
    #[default]
    Idle,
    Streaming,
    Complete,
    Failed(String),
}

impl SynthesisStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SynthesisStatus::Complete | SynthesisStatus::Failed(_))
    }
}

/// Result of a stage that may still be running
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum StageOutcome<T> {
    Pending,
    Ready(T),
    Failed(String),
}

impl<T> Default for StageOutcome<T> {
    fn default() -> Self {
        StageOutcome::Pending
    }
}

impl<T> StageOutcome<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            StageOutcome::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for StageOutcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => StageOutcome::Ready(value),
            Err(e) => StageOutcome::Failed(e.to_string()),
        }
    }
}

/// Hands out sessions and tracks which one is current.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    generation: Arc<RwLock<u64>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_generation(&self) -> u64 {
        *self.generation.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a session for `query`, invalidating every earlier session.
    ///
    /// Waits for in-flight writes to earlier sessions to finish, so none can
    /// land after this returns.
    pub fn begin(&self, query: SearchQuery, preferences: &Preferences) -> SearchSession {
        let generation = {
            let mut current = self.generation.write().unwrap_or_else(PoisonError::into_inner);
            *current += 1;
            *current
        };

        SearchSession {
            inner: Arc::new(SessionInner {
                id: search_id(&query.text, Some(query.mode.as_str())),
                query,
                generation,
                registry: Arc::clone(&self.generation),
                auto_expand_sections: preferences.auto_expand_sections,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    refinement: StageOutcome<RefinementResult>,
    results: StageOutcome<SearchResponse>,
    accumulator: StreamAccumulator,
    status: SynthesisStatus,
}

#[derive(Debug)]
struct SessionInner {
    id: String,
    query: SearchQuery,
    generation: u64,
    registry: Arc<RwLock<u64>>,
    auto_expand_sections: bool,
    state: Mutex<SessionState>,
}

/// Shared handle to one session's state
#[derive(Debug, Clone)]
pub struct SearchSession {
    inner: Arc<SessionInner>,
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: String,
    pub query: String,
    pub mode: String,
    pub generation: u64,
    pub current: bool,
    pub refinement: StageOutcome<RefinementResult>,
    pub results: StageOutcome<SearchResponse>,
    pub reasoning: String,
    pub answer: String,
    pub status: SynthesisStatus,
    /// Present once the answer stream has ended
    pub citations: Option<Vec<Citation>>,
    /// Present once the answer stream has ended
    pub related_searches: Option<Vec<String>>,
    pub auto_expand_sections: bool,
}

impl SearchSession {
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn query(&self) -> &SearchQuery {
        &self.inner.query
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn is_current(&self) -> bool {
        *self.inner.registry.read().unwrap_or_else(PoisonError::into_inner) == self.inner.generation
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` only while this session is current. The generation read
    /// lock is held for the whole write.
    fn write<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> Option<R> {
        let current = self.inner.registry.read().unwrap_or_else(PoisonError::into_inner);
        if *current != self.inner.generation {
            return None;
        }
        let result = f(&mut self.state());
        drop(current);
        Some(result)
    }

    pub(crate) fn set_refinement(&self, outcome: StageOutcome<RefinementResult>) -> bool {
        self.write(|state| state.refinement = outcome).is_some()
    }

    pub(crate) fn set_results(&self, outcome: StageOutcome<SearchResponse>) -> bool {
        self.write(|state| state.results = outcome).is_some()
    }

    pub(crate) fn begin_streaming(&self) -> bool {
        self.write(|state| {
            state.accumulator = StreamAccumulator::new();
            state.status = SynthesisStatus::Streaming;
        })
        .is_some()
    }

    /// Append one chunk. False once the session is stale or the stream has
    /// ended.
    pub(crate) fn append(&self, chunk: &StreamChunk) -> bool {
        self.write(|state| {
            if state.status != SynthesisStatus::Streaming {
                return false;
            }
            state.accumulator.apply(chunk);
            true
        })
        .unwrap_or(false)
    }

    pub(crate) fn complete(&self) -> bool {
        self.write(|state| state.status = SynthesisStatus::Complete).is_some()
    }

    /// Mark the stream failed; text accumulated so far is kept.
    pub(crate) fn fail(&self, message: impl Into<String>) -> bool {
        let message = message.into();
        self.write(|state| state.status = SynthesisStatus::Failed(message)).is_some()
    }

    pub fn refinement(&self) -> Option<RefinementResult> {
        self.state().refinement.ready().cloned()
    }

    pub fn status(&self) -> SynthesisStatus {
        self.state().status.clone()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let current = self.is_current();
        let state = self.state();
        let ended = state.status.is_terminal();

        let citations = ended.then(|| extract_citations(state.accumulator.answer()));
        let related_searches = ended.then(|| {
            state
                .results
                .ready()
                .and_then(|results| results.related_searches.as_ref())
                .map(|related| related.iter().map(|r| r.query.clone()).collect())
                .unwrap_or_default()
        });

        SessionSnapshot {
            id: self.inner.id.clone(),
            query: self.inner.query.text.clone(),
            mode: self.inner.query.mode.to_string(),
            generation: self.inner.generation,
            current,
            refinement: state.refinement.clone(),
            results: state.results.clone(),
            reasoning: state.accumulator.reasoning().to_string(),
            answer: state.accumulator.answer().to_string(),
            status: state.status.clone(),
            citations,
            related_searches,
            auto_expand_sections: self.inner.auto_expand_sections,
        }
    }
}
