use crate::llm::prompts;
use crate::models::portfolio::{holding_ticker, Portfolio};
use crate::server::state::AppState;
use crate::storage::files;
use crate::util;
use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use log::{error, info, warn};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Rows of CSV_C / CSV_E returned by `/api/init`.
const RECENT_ROWS: usize = 5;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/init", get(init))
        .route("/api/portfolio/save", post(save_portfolio))
        .route("/api/deep-analyze", post(deep_analyze))
        .route("/api/analyze/latest", get(analyze_latest))
        .route("/api/ai-strategy", post(ai_strategy))
        .with_state(state)
}

fn tail(mut records: Vec<Map<String, Value>>, n: usize) -> Vec<Map<String, Value>> {
    let skip = records.len().saturating_sub(n);
    records.drain(..skip);
    records
}

async fn current_portfolio(state: &AppState) -> Value {
    if let Some(saved) = state.saved_portfolio.read().await.as_ref() {
        return serde_json::to_value(saved).unwrap_or_else(|_| json!({ "holdings": [] }));
    }

    match state.store.fetch_json::<Value>(files::PORTFOLIO).await {
        Ok(portfolio) if portfolio.is_object() => portfolio,
        Ok(_) => json!({ "holdings": [] }),
        Err(e) => {
            warn!("Portfolio unavailable: {}", e);
            json!({ "holdings": [] })
        }
    }
}

/// Leaderboard, recent macro/sentiment rows and the portfolio.
async fn init(State(state): State<Arc<AppState>>) -> Json<Value> {
    let (analysis, updated_at) = match state.store.fetch_text(files::ANALYSIS).await {
        Ok(remote) => (
            util::csv_to_records(&remote.body).unwrap_or_default(),
            remote.last_modified.map(httpdate::fmt_http_date),
        ),
        Err(e) => {
            warn!("Could not load {}: {}", files::ANALYSIS, e);
            (Vec::new(), None)
        }
    };
    let macro_rows = state.store.fetch_csv_records(files::MACRO).await;
    let sentiment_rows = state.store.fetch_csv_records(files::SENTIMENT).await;

    Json(json!({
        "static": {
            "A": analysis,
            "C": tail(macro_rows, RECENT_ROWS),
            "E": tail(sentiment_rows, RECENT_ROWS),
        },
        "portfolio": current_portfolio(&state).await,
        "updated_at": updated_at,
    }))
}

/// Request body as JSON, whatever content type was declared.
fn request_body(body: &Bytes) -> std::result::Result<Value, String> {
    serde_json::from_slice(body).map_err(|e| format!("요청 본문을 해석할 수 없습니다 ({})", e))
}

async fn save_portfolio(State(state): State<Arc<AppState>>, body: Bytes) -> Json<Value> {
    let portfolio: Portfolio = match request_body(&body).and_then(|v| serde_json::from_value(v).map_err(|e| e.to_string())) {
        Ok(portfolio) => portfolio,
        Err(e) => {
            warn!("Rejected portfolio: {}", e);
            return Json(json!({ "status": "error", "message": e }));
        }
    };

    let received = portfolio.holdings.len();
    info!("Received portfolio with {} holdings: {}", received, portfolio.tickers().join(", "));

    if state.store.can_write() {
        match serde_json::to_vec_pretty(&portfolio) {
            Ok(body) => {
                if let Err(e) = state.store.put_file(files::PORTFOLIO, &body, "Update portfolio").await {
                    error!("Portfolio upload failed: {}", e);
                }
            }
            Err(e) => error!("Portfolio serialization failed: {}", e),
        }
    }

    *state.saved_portfolio.write().await = Some(portfolio);

    Json(json!({ "status": "success", "received": received }))
}

/// Tickers named by a deep-analyze request, normalized to six characters.
pub fn target_tickers(request: &Value) -> Vec<String> {
    let mode = request.get("type").and_then(|t| t.as_str()).unwrap_or("SINGLE");

    if mode.eq_ignore_ascii_case("PORTFOLIO") {
        request.get("portfolio")
            .and_then(|p| p.as_array())
            .map(|holdings| holdings.iter().filter_map(holding_ticker).collect())
            .unwrap_or_default()
    } else {
        holding_ticker(request).into_iter().collect()
    }
}

fn record_ticker(record: &Map<String, Value>) -> Option<String> {
    match record.get("ticker")? {
        Value::String(s) => Some(util::normalize_ticker(s)),
        Value::Number(n) => Some(util::normalize_ticker(&n.to_string())),
        _ => None,
    }
}

async fn deep_analyze(State(state): State<Arc<AppState>>, body: Bytes) -> Json<Value> {
    let request = match request_body(&body) {
        Ok(request) => request,
        Err(e) => return Json(json!({ "analysis": format!("🚨 분석 엔진 오류: {}", e) })),
    };

    let targets = target_tickers(&request);
    if targets.is_empty() {
        return Json(json!({ "analysis": "❌ 분석할 종목 코드가 요청에 없습니다." }));
    }

    let insight = state.store.fetch_csv_records(files::INSIGHT).await;
    if insight.is_empty() {
        return Json(json!({
            "analysis": format!("❌ 통합 데이터팩({})을 찾을 수 없습니다. 분석 파이프라인을 먼저 실행해주세요.", files::INSIGHT)
        }));
    }

    let matched: Vec<Map<String, Value>> = insight.into_iter()
        .filter(|r| record_ticker(r).is_some_and(|t| targets.contains(&t)))
        .collect();

    if matched.is_empty() {
        return Json(json!({
            "analysis": format!("❌ 선택하신 종목({})의 분석 데이터가 존재하지 않습니다.", targets.join(", "))
        }));
    }

    info!("Deep analysis of {} tickers with {}", matched.len(), state.llm.model_name());
    let prompt = prompts::deep_analysis_prompt(&matched);
    match state.llm.generate(&prompt).await {
        Ok(text) => Json(json!({ "analysis": text })),
        Err(e) => {
            error!("Deep analysis failed: {}", e);
            Json(json!({ "analysis": format!("🚨 분석 엔진 오류: {}", e) }))
        }
    }
}

async fn analyze_latest(State(state): State<Arc<AppState>>) -> Json<Value> {
    let data = state.store.fetch_csv_records(files::ANALYSIS).await;
    Json(json!({ "data": data }))
}

async fn ai_strategy(State(state): State<Arc<AppState>>, body: Bytes) -> Json<Value> {
    let request = match request_body(&body) {
        Ok(request) => request,
        Err(e) => return Json(json!({ "report": format!("🚨 분석 엔진 오류: {}", e) })),
    };
    let Some(stock_info) = request.get("stock_info").filter(|v| v.is_object()) else {
        return Json(json!({ "report": "❌ stock_info가 필요합니다." }));
    };

    let prompt = prompts::strategy_prompt(stock_info);
    match state.llm.generate(&prompt).await {
        Ok(text) => Json(json!({ "report": text })),
        Err(e) => {
            error!("Strategy report failed: {}", e);
            Json(json!({ "report": format!("🚨 분석 엔진 오류: {}", e) }))
        }
    }
}
