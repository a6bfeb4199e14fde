//! Test doubles and fixture helpers shared by the integration tests

#![allow(dead_code)]

use agrox_server::error::{AppError, AppResult, InferenceError};
use agrox_server::external::{CallbackService, RegistrationHook, RegistrationPayload};
use agrox_server::services::{
    ChatSession, ChatSessionFactory, DashboardServices, EnvironmentSource, InferenceService,
};
use async_trait::async_trait;
use axum::Router;
use shared::{
    AnalysisResult, ChatReply, DetectedIssues, GroundingSource, HarvestSuggestion, ImagePayload,
    MarketSnapshot, MarketTrend, NextCropSuggestion, SoilAnalysis, SoilSnapshot, UserProfile,
    WeatherSnapshot,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

/// Serve `app` on an ephemeral local port and return its base URL
pub async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

pub fn farmer() -> UserProfile {
    UserProfile {
        id: Uuid::new_v4(),
        name: "Somchai".to_string(),
        email: "somchai@farm.th".to_string(),
        phone: "+66812345678".to_string(),
        location: "18.79, 98.98".to_string(),
    }
}

pub fn image(name: &str) -> ImagePayload {
    ImagePayload {
        mime_type: "image/jpeg".to_string(),
        data: name.as_bytes().to_vec(),
        file_name: Some(format!("{}.jpg", name)),
    }
}

pub fn sample_analysis(crop: &str) -> AnalysisResult {
    AnalysisResult {
        crop_name: crop.to_string(),
        growth_stage: "Fruiting".to_string(),
        health_score: 64,
        is_healthy: false,
        disease: Some("Early blight".to_string()),
        deficiency: None,
        detected_issues: DetectedIssues {
            diseases: 50,
            pests: 20,
            nutrient_deficiency: 20,
            water_stress: 10,
        },
        soil_analysis: SoilAnalysis {
            recommendations: vec!["Apply potassium-rich fertilizer".to_string()],
        },
        weather_recommendations: vec!["Cover seedlings before Friday showers".to_string()],
        harvest_suggestion: HarvestSuggestion {
            timing: "In 2 weeks".to_string(),
            action: "Store".to_string(),
            is_refined: false,
        },
        next_crop_suggestion: NextCropSuggestion {
            crop_name: "Soybean".to_string(),
            reason: "Restores nitrogen".to_string(),
        },
    }
}

// ============================================================================
// Inference
// ============================================================================

pub struct FakeInference {
    pub analyze_calls: AtomicUsize,
    pub market_calls: Mutex<Vec<Option<String>>>,
    pub refine_calls: AtomicUsize,
    pub fail_analysis: AtomicBool,
    /// When set, refinement returns the input unchanged (not marked refined)
    pub refine_returns_unmarked: AtomicBool,
    /// When set, analyze waits for a notification before answering
    pub analyze_gate: Option<Arc<Notify>>,
    pub refine_gate: Option<Arc<Notify>>,
    /// Holds crop-scoped market calls only
    pub market_gate: Option<Arc<Notify>>,
}

impl FakeInference {
    pub fn new() -> Self {
        Self {
            analyze_calls: AtomicUsize::new(0),
            market_calls: Mutex::new(Vec::new()),
            refine_calls: AtomicUsize::new(0),
            fail_analysis: AtomicBool::new(false),
            refine_returns_unmarked: AtomicBool::new(false),
            analyze_gate: None,
            refine_gate: None,
            market_gate: None,
        }
    }

    pub fn with_analyze_gate(mut self, gate: Arc<Notify>) -> Self {
        self.analyze_gate = Some(gate);
        self
    }

    pub fn with_refine_gate(mut self, gate: Arc<Notify>) -> Self {
        self.refine_gate = Some(gate);
        self
    }

    pub fn with_market_gate(mut self, gate: Arc<Notify>) -> Self {
        self.market_gate = Some(gate);
        self
    }

    pub fn market_crops(&self) -> Vec<Option<String>> {
        self.market_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl InferenceService for FakeInference {
    async fn analyze_crop(
        &self,
        images: &[ImagePayload],
        _soil: &SoilSnapshot,
        _weather: &WeatherSnapshot,
        _location: &str,
    ) -> Result<AnalysisResult, InferenceError> {
        assert!(!images.is_empty() && images.len() <= 3);
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.analyze_gate {
            gate.notified().await;
        }
        if self.fail_analysis.load(Ordering::SeqCst) {
            return Err(InferenceError::MalformedResponse("not json".to_string()));
        }
        Ok(sample_analysis("Tomato"))
    }

    async fn get_market_data(&self, _location: &str, crop_name: Option<&str>) -> MarketSnapshot {
        self.market_calls
            .lock()
            .unwrap()
            .push(crop_name.map(str::to_string));
        if let (Some(gate), Some(_)) = (&self.market_gate, crop_name) {
            gate.notified().await;
        }
        MarketSnapshot {
            trend: if crop_name.is_some() {
                MarketTrend::Rising
            } else {
                MarketTrend::Stable
            },
            summary: format!("Market for {}", crop_name.unwrap_or("produce")),
            sources: vec![GroundingSource::new("https://market.example", "Market")],
        }
    }

    async fn refine_harvest_suggestion(
        &self,
        analysis: &AnalysisResult,
        _market: &MarketSnapshot,
        _weather: &WeatherSnapshot,
    ) -> AnalysisResult {
        self.refine_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.refine_gate {
            gate.notified().await;
        }
        if self.refine_returns_unmarked.load(Ordering::SeqCst) {
            return analysis.clone();
        }
        analysis.with_refined_harvest("Harvest this week".to_string(), "Sell Immediately".to_string())
    }
}

// ============================================================================
// Chat
// ============================================================================

#[derive(Default)]
pub struct ChatLog {
    /// Per call: message text and number of attached images
    pub calls: Mutex<Vec<(String, Option<usize>)>>,
    pub sessions_created: AtomicUsize,
    pub fail: AtomicBool,
}

pub struct FakeChatFactory {
    pub log: Arc<ChatLog>,
}

struct FakeChatSession {
    log: Arc<ChatLog>,
}

impl ChatSessionFactory for FakeChatFactory {
    fn create_session(&self, _location: &str) -> Arc<dyn ChatSession> {
        self.log.sessions_created.fetch_add(1, Ordering::SeqCst);
        Arc::new(FakeChatSession {
            log: self.log.clone(),
        })
    }
}

#[async_trait]
impl ChatSession for FakeChatSession {
    async fn send_message(
        &self,
        text: &str,
        images: Option<&[ImagePayload]>,
    ) -> Result<ChatReply, InferenceError> {
        self.log
            .calls
            .lock()
            .unwrap()
            .push((text.to_string(), images.map(|i| i.len())));
        if self.log.fail.load(Ordering::SeqCst) {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(ChatReply {
            text: format!("Answer to: {}", text),
            sources: vec![GroundingSource::new("https://maps.example/shop", "Seed shop")],
        })
    }
}

// ============================================================================
// Environment, callback, webhook
// ============================================================================

/// Moisture reported by the first soil fetch when it is gated
pub const STALE_MOISTURE: i32 = 10;

#[derive(Default)]
pub struct FakeEnvironment {
    pub soil_calls: AtomicUsize,
    /// When set, the first soil fetch waits for a notification and then
    /// reports `STALE_MOISTURE`
    pub first_soil_gate: Option<Arc<Notify>>,
}

impl FakeEnvironment {
    pub fn with_first_soil_gate(gate: Arc<Notify>) -> Self {
        Self {
            first_soil_gate: Some(gate),
            ..Self::default()
        }
    }
}

#[async_trait]
impl EnvironmentSource for FakeEnvironment {
    async fn fetch_soil(&self, _location: &str) -> SoilSnapshot {
        let call = self.soil_calls.fetch_add(1, Ordering::SeqCst);
        match &self.first_soil_gate {
            Some(gate) if call == 0 => {
                gate.notified().await;
                SoilSnapshot {
                    moisture: STALE_MOISTURE,
                    ..SoilSnapshot::fallback()
                }
            }
            _ => SoilSnapshot::fallback(),
        }
    }

    async fn fetch_weather(&self, _location: &str) -> WeatherSnapshot {
        WeatherSnapshot::fallback()
    }
}

#[derive(Default)]
pub struct FakeCallback {
    pub numbers: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl CallbackService for FakeCallback {
    async fn request_callback(&self, phone_number: &str) -> AppResult<()> {
        self.numbers.lock().unwrap().push(phone_number.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::CallbackFailed("vendor down".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingHook {
    pub payloads: Mutex<Vec<RegistrationPayload>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl RegistrationHook for RecordingHook {
    async fn notify(&self, payload: &RegistrationPayload) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::RegistrationService("connection refused".to_string()));
        }
        self.payloads.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

/// Doubles wired together, with handles kept for assertions
pub struct Fakes {
    pub inference: Arc<FakeInference>,
    pub chat: Arc<ChatLog>,
    pub environment: Arc<FakeEnvironment>,
    pub callback: Arc<FakeCallback>,
}

impl Fakes {
    pub fn new(inference: FakeInference) -> Self {
        Self {
            inference: Arc::new(inference),
            chat: Arc::new(ChatLog::default()),
            environment: Arc::new(FakeEnvironment::default()),
            callback: Arc::new(FakeCallback::default()),
        }
    }

    pub fn with_environment(mut self, environment: FakeEnvironment) -> Self {
        self.environment = Arc::new(environment);
        self
    }

    pub fn services(&self) -> DashboardServices {
        DashboardServices {
            inference: self.inference.clone(),
            chat: Arc::new(FakeChatFactory {
                log: self.chat.clone(),
            }),
            environment: self.environment.clone(),
            callback: self.callback.clone(),
        }
    }
}
