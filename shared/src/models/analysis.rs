//! Crop analysis models

use serde::{Deserialize, Serialize};

/// Percentage breakdown of the likely causes of crop stress
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DetectedIssues {
    pub diseases: i32,
    pub pests: i32,
    pub nutrient_deficiency: i32,
    pub water_stress: i32,
}

impl DetectedIssues {
    pub fn total(&self) -> i32 {
        self.diseases + self.pests + self.nutrient_deficiency + self.water_stress
    }

    /// The model is asked for a breakdown summing to 100; this is not enforced
    pub fn sums_to_hundred(&self) -> bool {
        self.total() == 100
    }

    fn clamp_percentages(&mut self) {
        for value in [
            &mut self.diseases,
            &mut self.pests,
            &mut self.nutrient_deficiency,
            &mut self.water_stress,
        ] {
            *value = (*value).clamp(0, 100);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SoilAnalysis {
    pub recommendations: Vec<String>,
}

/// Harvest timing and market action
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HarvestSuggestion {
    pub timing: String,
    pub action: String,
    /// Set once the market-aware second pass has run (successfully or not)
    #[serde(default)]
    pub is_refined: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NextCropSuggestion {
    pub crop_name: String,
    pub reason: String,
}

/// Result of one crop analysis
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub crop_name: String,
    pub growth_stage: String,
    pub health_score: i32,
    pub is_healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disease: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deficiency: Option<String>,
    pub detected_issues: DetectedIssues,
    pub soil_analysis: SoilAnalysis,
    pub weather_recommendations: Vec<String>,
    pub harvest_suggestion: HarvestSuggestion,
    pub next_crop_suggestion: NextCropSuggestion,
}

impl AnalysisResult {
    /// Copy of this result carrying a new harvest suggestion, marked refined
    pub fn with_refined_harvest(&self, timing: String, action: String) -> Self {
        Self {
            harvest_suggestion: HarvestSuggestion {
                timing,
                action,
                is_refined: true,
            },
            ..self.clone()
        }
    }

    /// Copy of this result with the current harvest suggestion marked refined
    pub fn marked_refined(&self) -> Self {
        Self {
            harvest_suggestion: HarvestSuggestion {
                is_refined: true,
                ..self.harvest_suggestion.clone()
            },
            ..self.clone()
        }
    }

    /// Pull the health score and issue percentages into 0..=100
    pub fn clamp_scores(&mut self) {
        self.health_score = self.health_score.clamp(0, 100);
        self.detected_issues.clamp_percentages();
    }

    pub fn health_label(&self) -> &'static str {
        if self.is_healthy {
            "Healthy"
        } else {
            "Unhealthy"
        }
    }
}
