//! WebAssembly module for the AgroX farm advisory service
//!
//! Provides client-side computation for:
//! - Signup and login form validation (same rules as the server)
//! - Location parsing
//! - Soil health and fertility classification

use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::models::*;
pub use shared::types::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("agrox-wasm initialized"));
}

/// Validate a signup form given as JSON.
///
/// Returns a JSON array of `{field, message}` objects; empty when valid.
#[wasm_bindgen]
pub fn validate_signup(form_json: &str) -> Result<String, JsValue> {
    let form: SignupForm = serde_json::from_str(form_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid form JSON: {}", e)))?;

    let errors = validate_signup_form(&form).err().unwrap_or_default();
    serde_json::to_string(&errors).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Validate a login form given as JSON, same output shape as `validate_signup`
#[wasm_bindgen]
pub fn validate_login(form_json: &str) -> Result<String, JsValue> {
    let form: LoginForm = serde_json::from_str(form_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid form JSON: {}", e)))?;

    let errors = validate_login_form(&form).err().unwrap_or_default();
    serde_json::to_string(&errors).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Whether a location string is a usable `"lat, lng"` pair
#[wasm_bindgen]
pub fn is_valid_location(location: &str) -> bool {
    Coordinates::parse(location).is_some()
}

/// Soil health label for a moisture percentage
#[wasm_bindgen]
pub fn soil_health_for_moisture(moisture: i32) -> String {
    SoilHealthStatus::from_moisture(moisture).to_string()
}

/// Fertility label for a moisture percentage
#[wasm_bindgen]
pub fn fertility_for_moisture(moisture: i32) -> String {
    SoilHealthStatus::from_moisture(moisture).fertility().to_string()
}

/// Relative-day outlook for a forecast given as JSON
#[wasm_bindgen]
pub fn forecast_outlook(forecast_json: &str) -> Result<String, JsValue> {
    let forecast: Vec<ForecastDay> = serde_json::from_str(forecast_json)
        .map_err(|e| JsValue::from_str(&format!("Invalid forecast JSON: {}", e)))?;
    Ok(outlook_for(&forecast))
}
