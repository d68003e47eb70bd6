use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Deserialize)]
pub struct FoodInfoParams {
    food_name: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    query: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    food_names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    ok: bool,
    templates_dir: String,
    excel_path: String,
    df_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// GET /get_food_info?food_name=… — the matching record as a JSON map in
/// column order. A missing param behaves like any other name with no
/// match.
pub async fn food_info_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FoodInfoParams>,
) -> Result<Response, AppError> {
    let name = params.food_name.unwrap_or_default();
    let record = state
        .engine
        .exact_lookup(&name)?
        .ok_or(AppError::NotFound)?;

    Ok(Json(record).into_response())
}

/// GET /search_foods?query=… — matching names; the unavailable branch
/// keeps the `food_names` field so clients always see the same shape.
pub async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Response {
    match state
        .engine
        .substring_search(params.query.as_deref().unwrap_or_default())
    {
        Ok(food_names) => Json(SearchResponse {
            food_names,
            error: None,
        })
        .into_response(),
        Err(err) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(SearchResponse {
                food_names: Vec::new(),
                error: Some(err.to_string()),
            }),
        )
            .into_response(),
    }
}

/// GET /health — machine-checkable readiness for an orchestrator, with
/// the resolved paths for operator diagnostics.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let health = state.engine.health();
    let status = if health.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = HealthResponse {
        ok: health.ok,
        templates_dir: state.config.templates_dir.display().to_string(),
        excel_path: state.config.excel_path.display().to_string(),
        df_loaded: health.ok,
        error: health.detail,
    };

    (status, Json(body)).into_response()
}

/// GET / — the index page with every food name rendered into the
/// deployment's template.
pub async fn index_handler(State(state): State<Arc<AppState>>) -> Response {
    let names = match state.engine.names() {
        Ok(names) => names,
        Err(err) => return (StatusCode::SERVICE_UNAVAILABLE, err.to_string()).into_response(),
    };

    let template_path = state.config.templates_dir.join("index.html");
    match tokio::fs::read_to_string(&template_path).await {
        Ok(template) => Html(render_index(&template, &names)).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to read {}: {err}", template_path.display()),
        )
            .into_response(),
    }
}

/// The page only needs the name list, so plain placeholder substitution
/// stands in for a template engine.
fn render_index(template: &str, names: &[String]) -> String {
    let items: String = names
        .iter()
        .map(|name| format!("<li>{}</li>\n", escape_html(name)))
        .collect();

    template.replace("{{food_names}}", &items)
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_index_substitutes_one_item_per_name() {
        let rendered = render_index(
            "<ul>\n{{food_names}}</ul>",
            &["백미밥".to_string(), "라면".to_string()],
        );

        assert_eq!(rendered, "<ul>\n<li>백미밥</li>\n<li>라면</li>\n</ul>");
    }

    #[test]
    fn render_index_escapes_markup_in_names() {
        let rendered = render_index("{{food_names}}", &["a<b>&c".to_string()]);

        assert_eq!(rendered, "<li>a&lt;b&gt;&amp;c</li>\n");
    }
}
