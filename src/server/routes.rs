// file: src/server/routes.rs
// description: request handlers for the form ui, json api and health check
// reference: axum handlers with typed extractors

use crate::error::Result;
use crate::models::{Answer, Query};
use crate::server::error::{ServerError, ServerResult};
use crate::server::state::AppState;
use crate::server::views::{FormValues, Outcome, render_page};
use crate::utils::{HealthReport, HealthStatus, Validator};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Default, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub insurance_type: String,
    #[serde(default)]
    pub region: String,
}

impl AskForm {
    fn to_query(&self) -> Query {
        Query {
            text: self.query.clone(),
            insurance_type: non_empty(&self.insurance_type),
            region: non_empty(&self.region),
        }
    }

    fn values(&self) -> FormValues {
        FormValues {
            query: self.query.clone(),
            insurance_type: self.insurance_type.clone(),
            region: self.region.clone(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthReport>) {
    let report = state.health();
    let status = match report.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(report))
}

pub async fn index(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(render_page(
        &state.options,
        &FormValues::default(),
        Outcome::Empty,
    ))
}

pub async fn ask(State(state): State<Arc<AppState>>, Form(form): Form<AskForm>) -> Response {
    let values = form.values();

    match run_query(&state, &form.to_query()).await {
        Ok(answer) => {
            Html(render_page(&state.options, &values, Outcome::Answer(&answer))).into_response()
        }
        Err(e) => {
            let error = ServerError::from(e);
            let message = error.to_string();
            (
                error.status_code(),
                Html(render_page(&state.options, &values, Outcome::Error(&message))),
            )
                .into_response()
        }
    }
}

pub async fn api_query(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<Query>, JsonRejection>,
) -> ServerResult<Json<Answer>> {
    let Json(query) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    let answer = run_query(&state, &query).await?;
    Ok(Json(answer))
}

async fn run_query(state: &AppState, query: &Query) -> Result<Answer> {
    Validator::validate_query_text(&query.text)?;
    Validator::validate_filter_value("insurance_type", query.insurance_type.as_deref())?;
    Validator::validate_filter_value("region", query.region.as_deref())?;

    info!(
        query = %Validator::truncate_text(query.text.trim(), 80),
        insurance_type = ?query.insurance_type_filter(),
        region = ?query.region_filter(),
        "Answering query"
    );

    state.agent.answer(query).await.inspect_err(|e| {
        warn!("Query failed: {}", e);
    })
}
