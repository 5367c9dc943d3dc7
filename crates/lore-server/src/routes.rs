//! Knowledge endpoints and the `{code, data, msg}` response envelope.
//!
//! Every response is HTTP 200; failures are told apart by `code`.

use std::collections::HashMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use lore_core::{KnowledgeKind, LoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::server::AppState;

pub const MSG_SUCCESS: &str = "success";
pub const MSG_INVALID_PARAMS: &str = "invalid params";
pub const MSG_FAILED: &str = "failed to process data";

/// Response envelope shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// 0 on success, 1 on any failure.
    pub code: i32,
    pub data: Value,
    pub msg: String,
}

impl ApiResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            code: 0,
            data,
            msg: MSG_SUCCESS.into(),
        }
    }

    pub fn error(err: &LoreError) -> Self {
        let msg = match err {
            LoreError::InvalidParams(_) => {
                tracing::warn!(kind = err.kind(), "rejected request: {err}");
                MSG_INVALID_PARAMS
            }
            _ => {
                tracing::error!(kind = err.kind(), "request failed: {err}");
                MSG_FAILED
            }
        };
        Self {
            code: 1,
            data: Value::Null,
            msg: msg.into(),
        }
    }
}

fn respond<T: Serialize>(result: Result<T, LoreError>) -> Json<ApiResponse> {
    let response = match result {
        Ok(data) => match serde_json::to_value(data) {
            Ok(data) => ApiResponse::ok(data),
            Err(e) => ApiResponse::error(&LoreError::StoreUnavailable(format!(
                "response encoding: {e}"
            ))),
        },
        Err(e) => ApiResponse::error(&e),
    };
    Json(response)
}

fn reject(detail: impl std::fmt::Display) -> Json<ApiResponse> {
    Json(ApiResponse::error(&LoreError::invalid(detail.to_string())))
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SaveQAndARequest {
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionItem {
    pub id: i64,
    pub question: String,
}

#[derive(Debug, Deserialize)]
pub struct UpQAndARequest {
    #[serde(default)]
    pub questions: Vec<QuestionItem>,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveKnowledgeRequest {
    #[serde(default)]
    pub texts: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TextItem {
    pub id: i64,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UpKnowledgeRequest {
    #[serde(default)]
    pub texts: Vec<TextItem>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub top_k: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct DelByIdsRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
struct GroupList {
    list: Vec<lore_core::KnowledgeEntry>,
}

/// A positive integer query value; anything else counts as absent.
fn positive_param(params: &HashMap<String, String>, name: &str) -> Option<usize> {
    params
        .get(name)
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as usize)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /knowledge/saveQAndA
pub async fn save_q_and_a(
    State(state): State<AppState>,
    payload: Result<Json<SaveQAndARequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return reject(e),
    };
    let result = state
        .run(state.coordinator.save_q_and_a(&req.questions, &req.answer))
        .await;
    respond(result.map(|_| ()))
}

/// POST /knowledge/upQAndA
pub async fn up_q_and_a(
    State(state): State<AppState>,
    payload: Result<Json<UpQAndARequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return reject(e),
    };
    let (ids, questions): (Vec<i64>, Vec<String>) =
        req.questions.into_iter().map(|q| (q.id, q.question)).unzip();
    respond(
        state
            .run(state.coordinator.update_q_and_a(&ids, &questions, &req.answer))
            .await,
    )
}

/// POST /knowledge/saveKnowledge
pub async fn save_knowledge(
    State(state): State<AppState>,
    payload: Result<Json<SaveKnowledgeRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return reject(e),
    };
    let result = state
        .run(state.coordinator.save_knowledge(&req.texts))
        .await;
    respond(result.map(|_| ()))
}

/// POST /knowledge/upKnowledge
pub async fn up_knowledge(
    State(state): State<AppState>,
    payload: Result<Json<UpKnowledgeRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return reject(e),
    };
    let (ids, texts): (Vec<i64>, Vec<String>) =
        req.texts.into_iter().map(|t| (t.id, t.text)).unzip();
    respond(
        state
            .run(state.coordinator.update_knowledge(&ids, &texts))
            .await,
    )
}

/// POST /knowledge/queryQAndA
pub async fn query_q_and_a(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return reject(e),
    };
    let top_k = req
        .top_k
        .filter(|k| *k > 0)
        .map(|k| k as usize)
        .unwrap_or(state.settings.default_top_k);
    respond(
        state
            .run(state.coordinator.search(&req.question, top_k))
            .await,
    )
}

/// GET /knowledge/getList?type=&page=&page_size=
pub async fn get_list(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Json<ApiResponse> {
    let Query(params) = match query {
        Ok(q) => q,
        Err(e) => return reject(e),
    };
    let code = params
        .get("type")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(0);
    let kind = match KnowledgeKind::from_filter(code) {
        Ok(kind) => kind,
        Err(e) => return respond::<()>(Err(e)),
    };
    let page = positive_param(&params, "page").unwrap_or(1);
    let page_size =
        positive_param(&params, "page_size").unwrap_or(state.settings.default_page_size);
    respond(
        state
            .run(state.coordinator.list(page, page_size, kind))
            .await,
    )
}

/// GET /knowledge/getByGroupKey?group_key=
pub async fn get_by_group_key(
    State(state): State<AppState>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Json<ApiResponse> {
    let Query(params) = match query {
        Ok(q) => q,
        Err(e) => return reject(e),
    };
    let group_key = params.get("group_key").map(String::as_str).unwrap_or("");
    let result = state
        .run(state.coordinator.get_by_group_key(group_key))
        .await;
    respond(result.map(|list| GroupList { list }))
}

/// POST /knowledge/delByIds
pub async fn del_by_ids(
    State(state): State<AppState>,
    payload: Result<Json<DelByIdsRequest>, JsonRejection>,
) -> Json<ApiResponse> {
    let Json(req) = match payload {
        Ok(p) => p,
        Err(e) => return reject(e),
    };
    let result = state.run(state.coordinator.delete(&req.ids)).await;
    respond(result.map(|_| ()))
}
