use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use tower::util::ServiceExt;

use voicemaker_server::handlers::{AppState, router};
use voicemaker_server::{CharClassTokenizer, SynthError, Synthesizer, Unconfigured, VoiceMaker};

struct Echo;

impl Synthesizer for Echo {
    fn synthesize(&self, phonemes: &str, _: u16, _: Option<&[u8]>) -> Result<Vec<u8>, SynthError> {
        Ok(phonemes.as_bytes().to_vec())
    }
}

fn make_app(synth: Box<dyn Synthesizer>) -> Router {
    let session = VoiceMaker::new(Box::new(CharClassTokenizer), synth);
    router(AppState::new(session))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn decode(body: &Value) -> String {
    let audio = STANDARD.decode(body["audio"].as_str().unwrap()).unwrap();
    String::from_utf8(audio).unwrap()
}

#[tokio::test]
async fn healthz_ok() {
    let app = make_app(Box::new(Echo));
    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn convert_accepts_positional_and_named_bodies() {
    let app = make_app(Box::new(Echo));

    let (status, body) = send(&app, "POST", "/v1/convert", Some(json!(["ab 12個", 120]))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decode(&body), "ab<NUMK VAL=12 COUNTER=個>");

    let (status, body) = send(
        &app,
        "POST",
        "/v1/convert",
        Some(json!({ "text": "hello", "speed": 300 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decode(&body), "hello");
}

#[tokio::test]
async fn invalid_arguments_are_bad_requests() {
    let app = make_app(Box::new(Echo));
    for args in [json!([]), json!(["a", 301]), json!(["a", true]), json!(["a", "m", 100])] {
        let (status, body) = send(&app, "POST", "/v1/convert", Some(args.clone())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{args}");
        assert!(body["error"].as_str().unwrap().starts_with("bad arguments"));
    }
}

#[tokio::test]
async fn stage_failures_report_stage_and_diagnostic() {
    let app = make_app(Box::new(Unconfigured));
    let (status, body) = send(&app, "POST", "/v1/convert", Some(json!(["ab 3個"]))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["stage"], "synthesize");
    assert_eq!(body["diagnostic"], "ab<NUMK VAL=3 COUNTER=個>");

    let (status, body) = send(&app, "GET", "/v1/diagnostic", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["diagnostic"], "ab<NUMK VAL=3 COUNTER=個>");
}

#[tokio::test]
async fn dictionary_management_round_trip() {
    let app = make_app(Box::new(Echo));
    let dir = tempfile::tempdir().unwrap();
    let paths = json!({
        "preferred": dir.path().join("preferred.dic"),
        "filter": dir.path().join("filter.dic"),
    });

    let (status, _) = send(&app, "PUT", "/v1/dictionary/paths", Some(paths)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let pair = json!({ "source": "rust", "destination": "ラスト" });
    let (status, _) = send(&app, "POST", "/v1/dictionary/preferred", Some(pair)).await;
    assert_eq!(status, StatusCode::CREATED);
    let pair = json!({ "source": "ヴァ", "destination": "バ" });
    let (status, _) = send(&app, "POST", "/v1/dictionary/filter", Some(pair)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "GET", "/v1/dictionary/preferred/rust", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["destination"], "ラスト");

    let (status, _) = send(&app, "POST", "/v1/dictionary/save", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "DELETE", "/v1/dictionary/preferred/rust", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);
    let (status, _) = send(&app, "GET", "/v1/dictionary/preferred/rust", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/v1/dictionary/load", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "preferred": 1, "filter": 1 }));
    let (_, body) = send(&app, "GET", "/v1/dictionary/preferred/rust", None).await;
    assert_eq!(body["destination"], "ラスト");
}

#[tokio::test]
async fn dictionary_errors_map_to_status_codes() {
    let app = make_app(Box::new(Echo));

    let pair = json!({ "source": "a", "destination": "b" });
    let (status, _) = send(&app, "POST", "/v1/dictionary/phonetic", Some(pair)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let pair = json!({ "source": "", "destination": "b" });
    let (status, _) = send(&app, "POST", "/v1/dictionary/filter", Some(pair)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/v1/dictionary/filter/a", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/v1/dictionary/load", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["stage"], Value::Null);
}
