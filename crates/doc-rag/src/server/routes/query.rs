//! Question endpoint over the active index

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::server::state::AppState;

/// `{"input": {"query": "..."}}`
#[derive(Debug, Deserialize)]
pub struct InvokeRequest {
    pub input: QueryInput,
}

#[derive(Debug, Deserialize)]
pub struct QueryInput {
    #[serde(default)]
    pub query: String,
}

/// `{"output": "...", "metadata": {...}}`
#[derive(Debug, Serialize)]
pub struct InvokeResponse {
    pub output: String,
    pub metadata: AnswerMetadata,
}

#[derive(Debug, Serialize)]
pub struct AnswerMetadata {
    pub source: String,
    pub chunks_used: usize,
}

/// POST /query/invoke - Answer a question about the uploaded document
pub async fn query_invoke(
    State(state): State<AppState>,
    body: axum::body::Bytes,
) -> Result<Json<InvokeResponse>> {
    let request: InvokeRequest = serde_json::from_slice(&body)
        .map_err(|e| Error::BadRequest(format!("Expected {{\"input\": {{\"query\": ...}}}}: {}", e)))?;

    let answer = state.query_engine().answer(&request.input.query).await?;

    Ok(Json(InvokeResponse {
        output: answer.text,
        metadata: AnswerMetadata {
            source: answer.source,
            chunks_used: answer.chunks_used,
        },
    }))
}
