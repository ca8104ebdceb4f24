use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::error;
use voicemaker_types::{DictKind, UnknownDictKind};

use crate::args::{ArgValue, ConvertRequest};
use crate::convert::VoiceMaker;
use crate::error::{Error, ErrorCategory};

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<VoiceMaker>>,
}

impl AppState {
    pub fn new(session: VoiceMaker) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}

/// Either the positional `["text", speed, "model"]` form or named fields.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum ConvertBody {
    Args(Vec<Value>),
    Named {
        text: String,
        speed: Option<i64>,
        model: Option<String>,
    },
}

#[derive(Serialize)]
pub struct ConvertResponse {
    audio: String,
}

#[derive(Deserialize)]
pub struct PathsBody {
    pub preferred: String,
    pub filter: String,
}

#[derive(Deserialize, Serialize)]
pub struct PairBody {
    pub source: String,
    pub destination: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/convert", post(convert))
        .route("/v1/diagnostic", get(diagnostic))
        .route("/v1/dictionary/paths", put(set_paths))
        .route("/v1/dictionary/load", post(load))
        .route("/v1/dictionary/save", post(save))
        .route("/v1/dictionary/{kind}", post(add_pair))
        .route(
            "/v1/dictionary/{kind}/{source}",
            get(lookup).delete(remove_pair),
        )
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    "ok"
}

async fn convert(
    State(state): State<AppState>,
    Json(body): Json<ConvertBody>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let audio = with_session(state, move |session| match body {
        ConvertBody::Args(values) => {
            let args: Vec<ArgValue> = values.into_iter().map(arg_value).collect();
            session.convert_args(&args)
        }
        ConvertBody::Named { text, speed, model } => {
            let mut request = ConvertRequest::new(text)?;
            if let Some(speed) = speed {
                request = request.with_speed(speed)?;
            }
            if let Some(model) = model {
                request = request.with_model(model);
            }
            Ok(session.convert(&request)?)
        }
    })
    .await?;
    Ok(Json(ConvertResponse { audio }))
}

fn arg_value(value: Value) -> ArgValue {
    match value {
        Value::String(s) => ArgValue::Str(s),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ArgValue::Int(i),
            None => ArgValue::Other("number"),
        },
        Value::Bool(_) => ArgValue::Other("boolean"),
        Value::Null => ArgValue::Other("null"),
        Value::Array(_) => ArgValue::Other("array"),
        Value::Object(_) => ArgValue::Other("object"),
    }
}

async fn diagnostic(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let diagnostic =
        with_session(state, |session| Ok(session.last_diagnostic().to_string())).await?;
    Ok(Json(json!({ "diagnostic": diagnostic })))
}

async fn set_paths(
    State(state): State<AppState>,
    Json(body): Json<PathsBody>,
) -> Result<StatusCode, ApiError> {
    with_session(state, move |session| {
        Ok(session.set_dictionary_paths(&body.preferred, &body.filter)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn load(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let (preferred, filter) = with_session(state, |session| {
        session.load_dictionary()?;
        let dict = session.dictionary();
        Ok((dict.len(DictKind::Preferred), dict.len(DictKind::Filter)))
    })
    .await?;
    Ok(Json(json!({ "preferred": preferred, "filter": filter })))
}

async fn save(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    with_session(state, |session| Ok(session.save_dictionary()?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_pair(
    State(state): State<AppState>,
    Path(kind): Path<String>,
    Json(body): Json<PairBody>,
) -> Result<StatusCode, ApiError> {
    with_session(state, move |session| {
        let kind: DictKind = kind.parse()?;
        Ok(session.add_word_pair(&body.source, &body.destination, kind)?)
    })
    .await?;
    Ok(StatusCode::CREATED)
}

async fn remove_pair(
    State(state): State<AppState>,
    Path((kind, source)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let removed = with_session(state, move |session| {
        let kind: DictKind = kind.parse()?;
        Ok(session.del_word_pair(&source, kind))
    })
    .await?;
    Ok(Json(json!({ "removed": removed })))
}

async fn lookup(
    State(state): State<AppState>,
    Path((kind, source)): Path<(String, String)>,
) -> Result<Json<PairBody>, ApiError> {
    if kind.parse::<DictKind>()? != DictKind::Preferred {
        return Err(ApiError::bad_request(
            "lookups are served from the preferred dictionary",
        ));
    }
    let destination = with_session(state, {
        let source = source.clone();
        move |session| Ok(session.get_dst_word(&source).map(str::to_string))
    })
    .await?;
    match destination {
        Some(destination) => Ok(Json(PairBody {
            source,
            destination,
        })),
        None => Err(ApiError::NotFound(format!("no preferred entry for {source}"))),
    }
}

/// Run `f` against the locked session on the blocking pool.
async fn with_session<T, F>(state: AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut VoiceMaker) -> Result<T, Error> + Send + 'static,
{
    let result = tokio::task::spawn_blocking(move || {
        let mut session = state
            .session
            .lock()
            .map_err(|_| ApiError::internal("session lock poisoned"))?;
        f(&mut session).map_err(ApiError::from)
    })
    .await;
    match result {
        Ok(inner) => inner,
        Err(err) => {
            error!("session task failed: {err}");
            Err(ApiError::internal("session task failed"))
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{message}")]
    Internal {
        message: String,
        stage: Option<&'static str>,
        diagnostic: Option<String>,
    },
}

impl ApiError {
    fn bad_request<T: Into<String>>(msg: T) -> Self {
        ApiError::BadRequest(msg.into())
    }

    fn internal<T: Into<String>>(msg: T) -> Self {
        ApiError::Internal {
            message: msg.into(),
            stage: None,
            diagnostic: None,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match (err.category(), err) {
            (ErrorCategory::Validation | ErrorCategory::Dictionary, err) => {
                ApiError::BadRequest(err.to_string())
            }
            (_, Error::Convert(err)) => ApiError::Internal {
                message: err.to_string(),
                stage: Some(err.stage.as_str()),
                diagnostic: Some(err.diagnostic),
            },
            (_, err) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<UnknownDictKind> for ApiError {
    fn from(err: UnknownDictKind) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": msg }))).into_response()
            }
            ApiError::Internal {
                message,
                stage,
                diagnostic,
            } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": message,
                    "stage": stage,
                    "diagnostic": diagnostic,
                })),
            )
                .into_response(),
        }
    }
}
