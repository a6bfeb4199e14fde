//! Per-user analysis dashboard
//!
//! Sequences environment fetch, crop analysis and harvest refinement, and
//! owns the chat transcript and callback banner for one signed-in user.
//!
//! State lives behind a `tokio::sync::RwLock` that is never held across an
//! outbound call. Each async step captures a generation counter, releases
//! the lock, awaits, then re-locks and commits only if the counter is still
//! current.

use serde::Serialize;
use shared::{
    is_first_user_turn, AnalysisResult, ChatMessage, ImagePayload, ImageSummary, MarketSnapshot,
    SoilSnapshot, UserProfile, WeatherSnapshot, CHAT_APOLOGY, CHAT_GREETING, MAX_IMAGES,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::DashboardConfig;
use crate::error::{AppError, AppResult, ANALYSIS_FAILED_MESSAGE, ANALYSIS_PRECONDITION_MESSAGE};
use crate::external::CallbackService;
use crate::services::chat::{ChatSession, ChatSessionFactory};
use crate::services::environment::EnvironmentSource;
use crate::services::inference::InferenceService;

pub const CALLBACK_SUCCESS_MESSAGE: &str = "Call initiated! You will receive a call shortly.";
pub const CALLBACK_FAILURE_MESSAGE: &str = "Failed to request callback. Please try again.";

/// Outbound services shared by every dashboard
#[derive(Clone)]
pub struct DashboardServices {
    pub inference: Arc<dyn InferenceService>,
    pub chat: Arc<dyn ChatSessionFactory>,
    pub environment: Arc<dyn EnvironmentSource>,
    pub callback: Arc<dyn CallbackService>,
}

#[derive(Debug, Clone, Copy)]
pub struct DashboardSettings {
    pub max_images: usize,
    pub callback_banner: Duration,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            max_images: MAX_IMAGES,
            callback_banner: Duration::from_secs(5),
        }
    }
}

impl From<&DashboardConfig> for DashboardSettings {
    fn from(config: &DashboardConfig) -> Self {
        Self {
            max_images: config.max_images.clamp(1, MAX_IMAGES),
            callback_banner: Duration::from_secs(config.callback_banner_secs),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
struct CallbackBanner {
    kind: BannerKind,
    message: &'static str,
    expires_at: Instant,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallbackStatus {
    #[serde(rename = "type")]
    pub kind: BannerKind,
    pub message: String,
}

#[derive(Default)]
struct DashboardState {
    soil: Option<SoilSnapshot>,
    weather: Option<WeatherSnapshot>,
    market: Option<MarketSnapshot>,
    images: Vec<ImagePayload>,
    analysis: Option<AnalysisResult>,
    transcript: Vec<ChatMessage>,
    chat_session: Option<Arc<dyn ChatSession>>,
    error: Option<String>,
    callback_banner: Option<CallbackBanner>,

    is_loading: bool,
    is_chat_loading: bool,
    is_market_data_loading: bool,
    is_callback_loading: bool,

    environment_generation: u64,
    analysis_generation: u64,
    market_generation: u64,
    chat_generation: u64,
    refining: Option<u64>,
}

impl DashboardState {
    /// Drop analysis, transcript and chat session, invalidating in-flight work
    fn reset_analysis(&mut self) {
        self.analysis_generation += 1;
        self.chat_generation += 1;
        self.analysis = None;
        self.transcript.clear();
        self.chat_session = None;
        self.error = None;
        self.refining = None;
        self.is_loading = false;
        self.is_chat_loading = false;
    }
}

/// Serializable view of a dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub user: UserProfile,
    pub soil: Option<SoilSnapshot>,
    pub weather: Option<WeatherSnapshot>,
    pub market: Option<MarketSnapshot>,
    pub images: Vec<ImageSummary>,
    pub analysis: Option<AnalysisResult>,
    pub transcript: Vec<ChatMessage>,
    pub chat_active: bool,
    pub error: Option<String>,
    pub callback_status: Option<CallbackStatus>,
    pub is_loading: bool,
    pub is_chat_loading: bool,
    pub is_market_data_loading: bool,
    pub is_callback_loading: bool,
}

pub struct Dashboard {
    user: UserProfile,
    services: DashboardServices,
    settings: DashboardSettings,
    state: RwLock<DashboardState>,
}

impl Dashboard {
    pub fn new(user: UserProfile, services: DashboardServices, settings: DashboardSettings) -> Self {
        Self {
            user,
            services,
            settings,
            state: RwLock::new(DashboardState::default()),
        }
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }

    pub async fn view(&self) -> DashboardView {
        let state = self.state.read().await;
        let now = Instant::now();

        DashboardView {
            user: self.user.clone(),
            soil: state.soil.clone(),
            weather: state.weather.clone(),
            market: state.market.clone(),
            images: state.images.iter().map(ImageSummary::from).collect(),
            analysis: state.analysis.clone(),
            transcript: state.transcript.clone(),
            chat_active: state.chat_session.is_some(),
            error: state.error.clone(),
            callback_status: state
                .callback_banner
                .as_ref()
                .filter(|banner| banner.expires_at > now)
                .map(|banner| CallbackStatus {
                    kind: banner.kind,
                    message: banner.message.to_string(),
                }),
            is_loading: state.is_loading,
            is_chat_loading: state.is_chat_loading,
            is_market_data_loading: state.is_market_data_loading,
            is_callback_loading: state.is_callback_loading,
        }
    }

    /// Fetch soil, weather and the generic market snapshot in parallel
    pub async fn load_environment(&self) {
        let (environment_generation, market_generation) = {
            let mut state = self.state.write().await;
            state.environment_generation += 1;
            state.market_generation += 1;
            state.is_market_data_loading = true;
            (state.environment_generation, state.market_generation)
        };

        let location = self.user.location.as_str();
        let (soil, weather, market) = tokio::join!(
            self.services.environment.fetch_soil(location),
            self.services.environment.fetch_weather(location),
            self.services.inference.get_market_data(location, None),
        );

        let mut state = self.state.write().await;
        if state.environment_generation != environment_generation {
            tracing::debug!(user_id = %self.user.id, "Discarding superseded environment snapshots");
            return;
        }
        state.soil = Some(soil);
        state.weather = Some(weather);
        if state.market_generation == market_generation {
            state.market = Some(market);
            state.is_market_data_loading = false;
        } else {
            tracing::debug!(user_id = %self.user.id, "Discarding superseded market snapshot");
        }
    }

    /// Replace the image set, keeping at most `max_images`
    pub async fn select_images(&self, mut images: Vec<ImagePayload>) {
        images.truncate(self.settings.max_images);

        let mut state = self.state.write().await;
        state.reset_analysis();
        state.images = images;
    }

    pub async fn clear_images(&self) {
        self.select_images(Vec::new()).await;
    }

    /// Run the primary crop analysis over the current image set
    pub async fn analyze(&self) -> AppResult<AnalysisResult> {
        let (generation, images, soil, weather) = {
            let mut state = self.state.write().await;

            if state.is_loading {
                return Err(AppError::Busy("Analysis".to_string()));
            }

            let inputs = match (&state.soil, &state.weather) {
                (Some(soil), Some(weather)) if !state.images.is_empty() => {
                    Some((soil.clone(), weather.clone()))
                }
                _ => None,
            };
            let Some((soil, weather)) = inputs else {
                state.error = Some(ANALYSIS_PRECONDITION_MESSAGE.to_string());
                return Err(AppError::ValidationError(
                    ANALYSIS_PRECONDITION_MESSAGE.to_string(),
                ));
            };

            let images = state.images.clone();
            state.reset_analysis();
            state.is_loading = true;

            (state.analysis_generation, images, soil, weather)
        };

        let result = self
            .services
            .inference
            .analyze_crop(&images, &soil, &weather, &self.user.location)
            .await;

        let mut state = self.state.write().await;
        if state.analysis_generation != generation {
            tracing::debug!(user_id = %self.user.id, "Discarding superseded analysis");
            return Err(AppError::Superseded("Analysis".to_string()));
        }
        state.is_loading = false;

        match result {
            Ok(mut analysis) => {
                analysis.harvest_suggestion.is_refined = false;
                state.analysis = Some(analysis.clone());
                state.chat_generation += 1;
                state.chat_session = Some(self.services.chat.create_session(&self.user.location));
                state.transcript = vec![ChatMessage::model(CHAT_GREETING)];
                Ok(analysis)
            }
            Err(e) => {
                tracing::error!(user_id = %self.user.id, error = %e, "Crop analysis failed");
                state.error = Some(ANALYSIS_FAILED_MESSAGE.to_string());
                Err(AppError::AnalysisFailed(e))
            }
        }
    }

    /// Fetch crop-specific market data and refine the harvest suggestion.
    ///
    /// Does nothing unless an unrefined analysis exists and no refinement for
    /// it is already running. Returns true when a refined result was stored.
    pub async fn refine_if_needed(&self) -> bool {
        let (generation, market_generation, analysis) = {
            let mut state = self.state.write().await;

            let generation = state.analysis_generation;
            let analysis = match &state.analysis {
                Some(analysis) if !analysis.harvest_suggestion.is_refined => analysis.clone(),
                _ => return false,
            };
            if state.refining == Some(generation) {
                return false;
            }

            state.refining = Some(generation);
            state.market_generation += 1;
            state.is_market_data_loading = true;

            (generation, state.market_generation, analysis)
        };

        let market = self
            .services
            .inference
            .get_market_data(&self.user.location, Some(&analysis.crop_name))
            .await;

        let weather = {
            let mut state = self.state.write().await;
            if state.market_generation == market_generation {
                state.is_market_data_loading = false;
                if state.analysis_generation == generation {
                    state.market = Some(market.clone());
                }
            }
            if state.analysis_generation != generation {
                tracing::debug!(user_id = %self.user.id, "Discarding market data for superseded analysis");
                return false;
            }
            match state.weather.clone() {
                Some(weather) => weather,
                None => {
                    tracing::debug!(user_id = %self.user.id, "Weather not loaded, skipping refinement");
                    state.refining = None;
                    return false;
                }
            }
        };

        let refined = self
            .services
            .inference
            .refine_harvest_suggestion(&analysis, &market, &weather)
            .await;

        let mut state = self.state.write().await;
        if state.analysis_generation != generation {
            tracing::debug!(user_id = %self.user.id, "Discarding superseded refinement");
            return false;
        }
        state.refining = None;

        let mut refined = refined;
        refined.harvest_suggestion.is_refined = true;
        state.analysis = Some(refined);
        true
    }

    /// Send a chat message; model failures are recorded in the transcript
    pub async fn send_chat_message(&self, text: &str) -> AppResult<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Validation {
                field: "message".to_string(),
                message: "Message is required.".to_string(),
            });
        }

        let (generation, session, images) = {
            let mut state = self.state.write().await;

            let session = match &state.chat_session {
                Some(session) if !state.images.is_empty() => session.clone(),
                _ => {
                    return Err(AppError::ValidationError(
                        "Analyze a crop image before starting a chat.".to_string(),
                    ))
                }
            };
            if state.is_chat_loading {
                return Err(AppError::Busy("Chat".to_string()));
            }

            let images = if is_first_user_turn(&state.transcript) {
                Some(state.images.clone())
            } else {
                None
            };
            state.transcript.push(ChatMessage::user(text));
            state.is_chat_loading = true;

            (state.chat_generation, session, images)
        };

        let reply = session.send_message(text, images.as_deref()).await;

        let mut state = self.state.write().await;
        if state.chat_generation != generation {
            tracing::debug!(user_id = %self.user.id, "Discarding reply for replaced chat session");
            return Ok(());
        }
        state.is_chat_loading = false;

        match reply {
            Ok(reply) => {
                state
                    .transcript
                    .push(ChatMessage::model_with_sources(reply.text, reply.sources));
            }
            Err(e) => {
                tracing::warn!(user_id = %self.user.id, error = %e, "Chat message failed");
                state.transcript.push(ChatMessage::model(CHAT_APOLOGY));
            }
        }
        Ok(())
    }

    /// Ask the voice assistant to call the user back
    pub async fn request_callback(&self) -> AppResult<()> {
        {
            let mut state = self.state.write().await;
            if state.is_callback_loading {
                return Err(AppError::Busy("Callback request".to_string()));
            }
            state.is_callback_loading = true;
            state.callback_banner = None;
        }

        let result = self.services.callback.request_callback(&self.user.phone).await;

        let mut state = self.state.write().await;
        state.is_callback_loading = false;

        let (kind, message) = match &result {
            Ok(()) => (BannerKind::Success, CALLBACK_SUCCESS_MESSAGE),
            Err(e) => {
                tracing::error!(user_id = %self.user.id, error = %e, "Callback request failed");
                (BannerKind::Error, CALLBACK_FAILURE_MESSAGE)
            }
        };
        state.callback_banner = Some(CallbackBanner {
            kind,
            message,
            expires_at: Instant::now() + self.settings.callback_banner,
        });

        result
    }
}

/// Dashboards of the signed-in users, keyed by user id
pub struct DashboardRegistry {
    services: DashboardServices,
    settings: DashboardSettings,
    dashboards: RwLock<HashMap<Uuid, Arc<Dashboard>>>,
}

impl DashboardRegistry {
    pub fn new(services: DashboardServices, settings: DashboardSettings) -> Self {
        Self {
            services,
            settings,
            dashboards: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Option<Arc<Dashboard>> {
        self.dashboards.read().await.get(&user_id).cloned()
    }

    /// Existing dashboard for the user, or a new one with its environment
    /// load started in the background
    pub async fn open(&self, user: &UserProfile) -> Arc<Dashboard> {
        if let Some(dashboard) = self.get(user.id).await {
            return dashboard;
        }

        let mut dashboards = self.dashboards.write().await;
        if let Some(dashboard) = dashboards.get(&user.id) {
            return dashboard.clone();
        }

        let dashboard = Arc::new(Dashboard::new(
            user.clone(),
            self.services.clone(),
            self.settings,
        ));
        dashboards.insert(user.id, dashboard.clone());
        drop(dashboards);

        tracing::info!(user_id = %user.id, "Dashboard created");

        let loader = dashboard.clone();
        tokio::spawn(async move {
            loader.load_environment().await;
        });

        dashboard
    }

    pub async fn remove(&self, user_id: Uuid) -> bool {
        let removed = self.dashboards.write().await.remove(&user_id).is_some();
        if removed {
            tracing::info!(user_id = %user_id, "Dashboard removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.dashboards.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.dashboards.read().await.is_empty()
    }
}
