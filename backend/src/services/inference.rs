//! Crop inference service
//!
//! Three generative requests: the full crop analysis, a grounded market
//! lookup, and the market-aware harvest refinement.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use shared::{AnalysisResult, ImagePayload, MarketSnapshot, SoilSnapshot, WeatherSnapshot};

use crate::error::InferenceError;
use crate::external::gemini::{GenerateContentRequest, GeminiClient, Part, Tool};

#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Full agronomic report for 1 to 3 crop photos. `is_refined` is always false.
    async fn analyze_crop(
        &self,
        images: &[ImagePayload],
        soil: &SoilSnapshot,
        weather: &WeatherSnapshot,
        location: &str,
    ) -> Result<AnalysisResult, InferenceError>;

    /// Market trend near `location`; falls back to a stable snapshot on failure
    async fn get_market_data(&self, location: &str, crop_name: Option<&str>) -> MarketSnapshot;

    /// Harvest suggestion re-evaluated against live market and weather.
    /// The returned result is always marked refined.
    async fn refine_harvest_suggestion(
        &self,
        analysis: &AnalysisResult,
        market: &MarketSnapshot,
        weather: &WeatherSnapshot,
    ) -> AnalysisResult;
}

/// Gemini-backed inference
#[derive(Clone)]
pub struct GeminiInference {
    client: GeminiClient,
}

#[derive(Debug, Deserialize)]
struct RefinedHarvest {
    timing: String,
    action: String,
}

impl GeminiInference {
    pub fn new(client: GeminiClient) -> Self {
        Self { client }
    }

    async fn request_refinement(
        &self,
        analysis: &AnalysisResult,
        market: &MarketSnapshot,
        weather: &WeatherSnapshot,
    ) -> Result<RefinedHarvest, InferenceError> {
        let request =
            GenerateContentRequest::user_turn(vec![Part::text(refine_prompt(analysis, market, weather))])
                .with_json_schema(harvest_suggestion_schema());

        let response = self.client.generate_content(&request).await?;
        let text = response.text().ok_or(InferenceError::EmptyResponse)?;
        Ok(serde_json::from_str(text.trim())?)
    }
}

#[async_trait]
impl InferenceService for GeminiInference {
    async fn analyze_crop(
        &self,
        images: &[ImagePayload],
        soil: &SoilSnapshot,
        weather: &WeatherSnapshot,
        location: &str,
    ) -> Result<AnalysisResult, InferenceError> {
        let mut parts: Vec<Part> = images.iter().map(Part::image).collect();
        parts.push(Part::text(analysis_prompt(soil, weather, location)));

        let request =
            GenerateContentRequest::user_turn(parts).with_json_schema(analysis_response_schema());

        tracing::info!(images = images.len(), model = self.client.model(), "Requesting crop analysis");

        let response = self.client.generate_content(&request).await.map_err(|e| {
            tracing::error!(error = %e, "Crop analysis request failed");
            e
        })?;
        let text = response.text().ok_or(InferenceError::EmptyResponse)?;

        let mut result: AnalysisResult = serde_json::from_str(text.trim())?;
        result.clamp_scores();
        result.harvest_suggestion.is_refined = false;

        tracing::info!(crop = %result.crop_name, health_score = result.health_score, "Crop analysis complete");
        Ok(result)
    }

    async fn get_market_data(&self, location: &str, crop_name: Option<&str>) -> MarketSnapshot {
        let request = GenerateContentRequest::user_turn(vec![Part::text(market_prompt(
            location, crop_name,
        ))])
        .with_tool(Tool::GoogleSearch {});

        let response = match self.client.generate_content(&request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(crop = ?crop_name, error = %e, "Market data request failed, using fallback");
                return MarketSnapshot::fallback();
            }
        };

        let Some(text) = response.text() else {
            tracing::warn!(crop = ?crop_name, "Market data response had no text, using fallback");
            return MarketSnapshot::fallback();
        };

        let market = MarketSnapshot::from_response_text(&text, response.web_sources());
        tracing::debug!(crop = ?crop_name, trend = %market.trend, sources = market.sources.len(), "Fetched market data");
        market
    }

    async fn refine_harvest_suggestion(
        &self,
        analysis: &AnalysisResult,
        market: &MarketSnapshot,
        weather: &WeatherSnapshot,
    ) -> AnalysisResult {
        match self.request_refinement(analysis, market, weather).await {
            Ok(refined) => {
                tracing::info!(crop = %analysis.crop_name, timing = %refined.timing, "Harvest suggestion refined");
                analysis.with_refined_harvest(refined.timing, refined.action)
            }
            Err(e) => {
                tracing::warn!(
                    crop = %analysis.crop_name,
                    error = %e,
                    "Harvest refinement failed, keeping initial suggestion"
                );
                analysis.marked_refined()
            }
        }
    }
}

// ============================================================================
// Prompts
// ============================================================================

fn analysis_prompt(soil: &SoilSnapshot, weather: &WeatherSnapshot, location: &str) -> String {
    let soil_json = serde_json::to_string(soil).unwrap_or_default();
    let weather_json = serde_json::to_string(weather).unwrap_or_default();

    format!(
        r#"Analyze the provided crop images (multiple angles may be provided for better context) and the supplementary data to provide a comprehensive agricultural report.

**Contextual Data:**
- **User Location (Lat, Lng):** {location}
- **Soil Data:** {soil_json}
- **Weather Forecast:** {weather_json}

**Instructions:**
1. **Identify Crop:** Identify the crop and its growth stage from the image.
2. **Health Assessment:** Analyze the crop's health. Provide a health score from 0-100.
3. **Diagnosis:** If the crop is unhealthy, identify the specific disease. If it's not diseased but shows signs of stress, identify potential deficiencies (e.g., lack of nitrogen, water stress).
4. **Issue Breakdown:** Provide a percentage-based breakdown of potential issues, ensuring the total sums to 100, across these categories: 'diseases', 'pests', 'nutrientDeficiency', 'waterStress'. For a healthy plant, these can be low but non-zero, representing potential risks.
5. **Soil & Treatment Plan:** Based on the diagnosis and the provided soil data, recommend specific actions. Consider pests, fertilizer needs, and watering schedules.
6. **Weather-based Actions:** Based on the 7-day weather forecast, provide a short list of time-based recommendations (e.g., "Prepare for heavy rain on Wednesday," "Irrigate on Friday due to high temperatures").
7. **Harvest & Market Advice:** Suggest the optimal time for harvesting. Based on general market knowledge for this crop, advise whether to sell the produce immediately or store it.
8. **Succession Planting:** Recommend a suitable crop to plant next in the same field, considering seasonality, weather, and market opportunities.

Return the analysis in the specified JSON format."#
    )
}

fn market_prompt(location: &str, crop_name: Option<&str>) -> String {
    let product = crop_name
        .filter(|c| !c.is_empty())
        .unwrap_or("a common local agricultural product");

    format!(
        r#"Analyze the agricultural market trends for {product} in the region around location: {location}.
Provide the general market trend and a concise summary.
The trend must be one of: 'Rising', 'Stable', 'Falling'.

Return your response as a JSON object inside a markdown code block. The JSON object should have two keys: "trend" and "summary".
For example:
```json
{{
  "trend": "Rising",
  "summary": "Tomato prices are expected to rise by 15% next month due to regional demand."
}}
```"#
    )
}

fn refine_prompt(
    analysis: &AnalysisResult,
    market: &MarketSnapshot,
    weather: &WeatherSnapshot,
) -> String {
    let forecast_json = serde_json::to_string(&weather.forecast).unwrap_or_default();

    format!(
        r#"Based on an initial crop analysis, current market data, and a weather forecast, provide a refined harvest and market recommendation.

**Initial Crop Analysis Summary:**
- Crop: {crop}
- Current Health: {health} (Score: {score}/100)
- Initial Harvest Timing: {timing}

**Live Market Data:**
- Trend: {trend}
- Summary: {market_summary}

**7-Day Weather Forecast:**
- Summary: {weather_summary}
- Outlook: {outlook}
- Forecast: {forecast_json}

**Instructions:**
1. Re-evaluate the **harvest timing**. Consider if upcoming weather (e.g., rain, heatwave) should accelerate or delay the initial timing.
2. Provide a clear **market action**. Based *specifically* on the live market trend and summary, recommend whether to 'Sell Immediately' to capitalize on high prices, 'Store' to wait for better prices if the trend is falling, or another specific action.
3. Your response must be a JSON object matching the provided schema. Be concise and actionable."#,
        crop = analysis.crop_name,
        health = analysis.health_label(),
        score = analysis.health_score,
        timing = analysis.harvest_suggestion.timing,
        trend = market.trend,
        market_summary = market.summary,
        weather_summary = weather.summary,
        outlook = weather.outlook,
    )
}

// ============================================================================
// Response schemas
// ============================================================================

fn harvest_suggestion_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "timing": {"type": "STRING", "description": "Optimal time to harvest (e.g., 'In 2 weeks')."},
            "action": {"type": "STRING", "description": "Suggestion like 'Store' or 'Sell Immediately' based on the provided context."}
        },
        "required": ["timing", "action"]
    })
}

fn analysis_response_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "cropName": {"type": "STRING", "description": "Identified name of the crop."},
            "growthStage": {"type": "STRING", "description": "Current growth stage of the crop (e.g., vegetative, flowering, fruiting)."},
            "healthScore": {"type": "INTEGER", "description": "A score from 0 to 100 indicating the crop's health."},
            "isHealthy": {"type": "BOOLEAN", "description": "True if the plant is generally healthy, false otherwise."},
            "disease": {"type": "STRING", "description": "Name of the disease if the plant is unhealthy. Otherwise, 'None'."},
            "deficiency": {"type": "STRING", "description": "Nutrient or water deficiency if detected. Otherwise, 'None'."},
            "detectedIssues": {
                "type": "OBJECT",
                "properties": {
                    "diseases": {"type": "INTEGER", "description": "Percentage of issues related to diseases (0-100)."},
                    "pests": {"type": "INTEGER", "description": "Percentage of issues related to pests (0-100)."},
                    "nutrientDeficiency": {"type": "INTEGER", "description": "Percentage of issues related to nutrient deficiency (0-100)."},
                    "waterStress": {"type": "INTEGER", "description": "Percentage of issues related to water stress (0-100)."}
                },
                "description": "A percentage-based breakdown of potential issues. The sum should be 100."
            },
            "soilAnalysis": {
                "type": "OBJECT",
                "properties": {
                    "recommendations": {
                        "type": "ARRAY",
                        "items": {"type": "STRING"},
                        "description": "List of recommendations based on soil data (e.g., pest control, fertilizer needs, watering adjustments)."
                    }
                }
            },
            "weatherRecommendations": {
                "type": "ARRAY",
                "items": {"type": "STRING"},
                "description": "List of actionable recommendations for the next week based on the weather forecast."
            },
            "harvestSuggestion": harvest_suggestion_schema(),
            "nextCropSuggestion": {
                "type": "OBJECT",
                "properties": {
                    "cropName": {"type": "STRING", "description": "Recommended crop to plant next."},
                    "reason": {"type": "STRING", "description": "Reason for the recommendation (e.g., seasonal factors, market demand)."}
                }
            }
        },
        "required": [
            "cropName", "growthStage", "healthScore", "isHealthy", "detectedIssues",
            "soilAnalysis", "weatherRecommendations", "harvestSuggestion", "nextCropSuggestion"
        ]
    })
}
