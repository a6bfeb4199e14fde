//! Inference and chat tests against a fixture generateContent endpoint
//!
//! The fixture replays queued responses and records every request body so
//! the wire format can be checked alongside the parsed results.

mod common;

use agrox_server::error::InferenceError;
use agrox_server::external::GeminiClient;
use agrox_server::services::{
    ChatSession, ChatSessionFactory, GeminiChatFactory, GeminiInference, InferenceService,
};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::{image, sample_analysis, spawn_server};
use serde_json::{json, Value};
use shared::{GroundingSource, MarketSnapshot, MarketTrend, SoilSnapshot, WeatherSnapshot};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Fixture {
    responses: Mutex<VecDeque<(StatusCode, Value)>>,
    requests: Mutex<Vec<Value>>,
    calls: Mutex<Vec<(String, Option<String>)>>,
}

impl Fixture {
    fn reply(&self, status: StatusCode, body: Value) {
        self.responses.lock().unwrap().push_back((status, body));
    }

    fn reply_text(&self, text: &str) {
        self.reply(StatusCode::OK, text_response(text, json!([])));
    }

    fn request(&self, index: usize) -> Value {
        self.requests.lock().unwrap()[index].clone()
    }
}

async fn generate(
    State(fixture): State<Arc<Fixture>>,
    Path(call): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let api_key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    fixture.calls.lock().unwrap().push((call, api_key));
    fixture.requests.lock().unwrap().push(body);

    let (status, body) = fixture
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "no response queued"})));
    (status, Json(body))
}

fn text_response(text: &str, grounding_chunks: Value) -> Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "groundingMetadata": {"groundingChunks": grounding_chunks}
        }]
    })
}

async fn fixture_client() -> (GeminiClient, Arc<Fixture>) {
    let fixture = Arc::new(Fixture::default());
    let app = Router::new()
        .route("/models/:call", post(generate))
        .with_state(fixture.clone());
    let base_url = spawn_server(app).await;

    (GeminiClient::with_base_url(base_url, "gemini-test"), fixture)
}

// ============================================================================
// Crop analysis
// ============================================================================

#[tokio::test]
async fn test_analyze_crop_sends_images_and_schema() {
    let (client, fixture) = fixture_client().await;
    let mut answer = sample_analysis("Rice");
    answer.harvest_suggestion.is_refined = true;
    fixture.reply_text(&serde_json::to_string(&answer).unwrap());

    let inference = GeminiInference::new(client);
    let result = inference
        .analyze_crop(
            &[image("leaf-front"), image("leaf-back")],
            &SoilSnapshot::fallback(),
            &WeatherSnapshot::fallback(),
            "18.79, 98.98",
        )
        .await
        .unwrap();

    assert_eq!(result.crop_name, "Rice");
    assert_eq!(result.detected_issues.total(), 100);
    assert!(!result.harvest_suggestion.is_refined);

    let calls = fixture.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![(
            "gemini-test:generateContent".to_string(),
            Some("test-key".to_string())
        )]
    );

    let request = fixture.request(0);
    let parts = request["contents"][0]["parts"].as_array().unwrap();
    assert_eq!(parts.len(), 3);
    assert_eq!(parts[0]["inlineData"]["mimeType"], "image/jpeg");
    assert_eq!(parts[0]["inlineData"]["data"], STANDARD.encode("leaf-front"));
    assert!(parts[2]["text"].as_str().unwrap().contains("18.79, 98.98"));
    assert_eq!(
        request["generationConfig"]["responseMimeType"],
        "application/json"
    );
    assert!(request.get("tools").is_none());
}

#[tokio::test]
async fn test_analyze_crop_clamps_scores() {
    let (client, fixture) = fixture_client().await;
    let mut answer = sample_analysis("Maize");
    answer.health_score = 130;
    answer.detected_issues.water_stress = -20;
    fixture.reply_text(&serde_json::to_string(&answer).unwrap());

    let result = GeminiInference::new(client)
        .analyze_crop(
            &[image("maize")],
            &SoilSnapshot::fallback(),
            &WeatherSnapshot::fallback(),
            "18.79,98.98",
        )
        .await
        .unwrap();

    assert_eq!(result.health_score, 100);
    assert_eq!(result.detected_issues.water_stress, 0);
    assert_eq!(result.detected_issues.diseases, 50);
}

#[tokio::test]
async fn test_analyze_crop_rejects_non_json_answer() {
    let (client, fixture) = fixture_client().await;
    fixture.reply_text("I could not find a plant in this photo.");

    let result = GeminiInference::new(client)
        .analyze_crop(
            &[image("blurry")],
            &SoilSnapshot::fallback(),
            &WeatherSnapshot::fallback(),
            "18.79,98.98",
        )
        .await;

    assert!(matches!(result, Err(InferenceError::MalformedResponse(_))));
}

#[tokio::test]
async fn test_analyze_crop_surfaces_status_errors() {
    let (client, fixture) = fixture_client().await;
    fixture.reply(StatusCode::TOO_MANY_REQUESTS, json!({"error": "quota"}));

    let result = GeminiInference::new(client)
        .analyze_crop(
            &[image("leaf")],
            &SoilSnapshot::fallback(),
            &WeatherSnapshot::fallback(),
            "18.79,98.98",
        )
        .await;

    assert!(matches!(
        result,
        Err(InferenceError::Status { status: 429, .. })
    ));
}

// ============================================================================
// Market data
// ============================================================================

#[tokio::test]
async fn test_market_data_parses_fenced_json_and_dedups_sources() {
    let (client, fixture) = fixture_client().await;
    fixture.reply(
        StatusCode::OK,
        text_response(
            "Here is the outlook:\n```json\n{\"trend\": \"Rising\", \"summary\": \"Tomato prices up 10%.\"}\n```",
            json!([
                {"web": {"uri": "https://news.example/a", "title": "Market news"}},
                {"web": {"uri": "https://news.example/a", "title": "Market news"}},
                {"web": {"uri": "https://prices.example/b"}}
            ]),
        ),
    );

    let market = GeminiInference::new(client)
        .get_market_data("18.79,98.98", Some("Tomato"))
        .await;

    assert_eq!(market.trend, MarketTrend::Rising);
    assert_eq!(market.summary, "Tomato prices up 10%.");
    assert_eq!(
        market.sources,
        vec![
            GroundingSource::new("https://news.example/a", "Market news"),
            GroundingSource::new("https://prices.example/b", "Web Search Result"),
        ]
    );

    let request = fixture.request(0);
    assert_eq!(request["tools"], json!([{"googleSearch": {}}]));
    assert!(request["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("market trends for Tomato"));
    assert!(request.get("generationConfig").is_none());
}

#[tokio::test]
async fn test_market_data_scans_free_text() {
    let (client, fixture) = fixture_client().await;
    let text = "Rice prices are falling after a strong harvest.";
    fixture.reply_text(text);

    let market = GeminiInference::new(client)
        .get_market_data("18.79,98.98", None)
        .await;

    assert_eq!(market.trend, MarketTrend::Falling);
    assert_eq!(market.summary, text);
    assert!(fixture.request(0)["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("a common local agricultural product"));
}

#[tokio::test]
async fn test_market_data_falls_back_on_error() {
    let (client, fixture) = fixture_client().await;
    fixture.reply(StatusCode::INTERNAL_SERVER_ERROR, json!({}));

    let market = GeminiInference::new(client)
        .get_market_data("18.79,98.98", Some("Tomato"))
        .await;

    assert_eq!(market, MarketSnapshot::fallback());
}

// ============================================================================
// Harvest refinement
// ============================================================================

#[tokio::test]
async fn test_refinement_replaces_harvest_suggestion() {
    let (client, fixture) = fixture_client().await;
    fixture.reply_text(r#"{"timing": "Harvest this week", "action": "Sell Immediately"}"#);
    let analysis = sample_analysis("Tomato");

    let refined = GeminiInference::new(client)
        .refine_harvest_suggestion(&analysis, &MarketSnapshot::fallback(), &WeatherSnapshot::fallback())
        .await;

    assert_eq!(refined.harvest_suggestion.timing, "Harvest this week");
    assert_eq!(refined.harvest_suggestion.action, "Sell Immediately");
    assert!(refined.harvest_suggestion.is_refined);
    assert_eq!(refined.crop_name, analysis.crop_name);
    assert_eq!(refined.next_crop_suggestion, analysis.next_crop_suggestion);

    let request = fixture.request(0);
    assert_eq!(
        request["generationConfig"]["responseSchema"]["required"],
        json!(["timing", "action"])
    );
}

#[tokio::test]
async fn test_failed_refinement_still_marks_refined() {
    let (client, fixture) = fixture_client().await;
    fixture.reply_text("not json at all");
    let analysis = sample_analysis("Tomato");

    let refined = GeminiInference::new(client)
        .refine_harvest_suggestion(&analysis, &MarketSnapshot::fallback(), &WeatherSnapshot::fallback())
        .await;

    assert!(refined.harvest_suggestion.is_refined);
    assert_eq!(refined.harvest_suggestion.timing, analysis.harvest_suggestion.timing);
    assert_eq!(refined.harvest_suggestion.action, analysis.harvest_suggestion.action);
}

// ============================================================================
// Chat sessions
// ============================================================================

#[tokio::test]
async fn test_chat_session_keeps_history_and_cites_places() {
    let (client, fixture) = fixture_client().await;
    fixture.reply(
        StatusCode::OK,
        text_response(
            "Try the cooperative store on Route 11.",
            json!([
                {"maps": {
                    "uri": "https://maps.example/coop",
                    "title": "Farmers Cooperative",
                    "placeAnswerSources": {"reviewSnippets": [
                        {"uri": "https://maps.example/review/1", "text": "Great seed supplier with friendly staff"}
                    ]}
                }},
                {"maps": {"uri": "https://maps.example/coop", "title": "Farmers Cooperative"}}
            ]),
        ),
    );
    fixture.reply_text("Apply it early in the morning.");

    let session = GeminiChatFactory::new(client).create_session("18.79, 98.98");
    let images = vec![image("leaf")];

    let first = session
        .send_message("Where can I buy fungicide?", Some(images.as_slice()))
        .await
        .unwrap();
    assert_eq!(first.text, "Try the cooperative store on Route 11.");
    assert_eq!(
        first.sources,
        vec![
            GroundingSource::new("https://maps.example/coop", "Farmers Cooperative"),
            GroundingSource::new(
                "https://maps.example/review/1",
                "Review: Great seed supplier with frien..."
            ),
        ]
    );

    let second = session.send_message("When should I spray?", None).await.unwrap();
    assert!(second.sources.is_empty());

    let first_request = fixture.request(0);
    assert_eq!(first_request["tools"], json!([{"googleMaps": {}}]));
    assert_eq!(
        first_request["toolConfig"]["retrievalConfig"]["latLng"],
        json!({"latitude": 18.79, "longitude": 98.98})
    );
    assert!(first_request["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .contains("18.79, 98.98"));
    assert!(first_request["contents"][0]["parts"][0].get("inlineData").is_some());

    let second_request = fixture.request(1);
    let contents = second_request["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[2]["parts"], json!([{"text": "When should I spray?"}]));
}

#[tokio::test]
async fn test_failed_chat_turn_is_not_remembered() {
    let (client, fixture) = fixture_client().await;
    fixture.reply(StatusCode::SERVICE_UNAVAILABLE, json!({}));
    fixture.reply_text("Hello again.");

    let session = GeminiChatFactory::new(client).create_session("somewhere green");

    assert!(session.send_message("Hello?", None).await.is_err());
    session.send_message("Hello again?", None).await.unwrap();

    let request = fixture.request(1);
    assert_eq!(request["contents"].as_array().unwrap().len(), 1);
    assert!(request.get("toolConfig").is_none());
}
