//! Question answering over the active index

use std::sync::Arc;
use std::time::Instant;

use crate::config::DispatchConfig;
use crate::error::{Error, Result};
use crate::ingestion::TypeResolver;
use crate::providers::LlmProvider;
use crate::session::SessionStore;
use crate::types::Kind;

use super::prompt::PromptBuilder;

/// Generated answer plus what it was grounded on
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Filename of the indexed upload
    pub source: String,
    pub chunks_used: usize,
}

/// Retrieve-then-generate over the session index
#[derive(Clone)]
pub struct QueryEngine {
    sessions: Arc<SessionStore>,
    resolver: Arc<TypeResolver>,
    dispatch: Arc<DispatchConfig>,
    llm: Arc<dyn LlmProvider>,
    top_k: usize,
}

impl QueryEngine {
    pub fn new(
        sessions: Arc<SessionStore>,
        resolver: Arc<TypeResolver>,
        dispatch: Arc<DispatchConfig>,
        llm: Arc<dyn LlmProvider>,
        top_k: usize,
    ) -> Self {
        Self {
            sessions,
            resolver,
            dispatch,
            llm,
            top_k,
        }
    }

    /// Answer `query` from the currently loaded document
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        let session = self.sessions.current().ok_or(Error::NoIndex)?;
        if session.index.is_empty() {
            return Err(Error::NoIndex);
        }

        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidQuery("query must not be empty".to_string()));
        }

        // The temp file is gone by now, so only the extension can be re-checked
        let kind = match self.resolver.resolve_extension(&session.source_path) {
            Some(kind) => kind,
            None => session.kind,
        };
        if kind == Kind::Unknown {
            return Err(Error::UnsupportedKind(session.filename.clone()));
        }
        let llm_model = &self.dispatch.profile(kind)?.llm_model;

        tracing::info!(
            "Query against {} ({}), model {}: {}",
            session.filename,
            kind,
            llm_model,
            query
        );

        let start = Instant::now();
        let results = session.index.retrieve(query, self.top_k).await?;
        let context = PromptBuilder::build_context(&results);
        let prompt = PromptBuilder::build_answer_prompt(query, &context);

        let text = self.llm.generate(llm_model, &prompt).await?;

        tracing::info!(
            "Answered with {} chunks via {} in {:.2}s",
            results.len(),
            self.llm.name(),
            start.elapsed().as_secs_f64()
        );

        Ok(Answer {
            text,
            source: session.filename.clone(),
            chunks_used: results.len(),
        })
    }
}
