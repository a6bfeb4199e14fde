//! External API integrations

pub mod gemini;
pub mod vapi;
pub mod weather;
pub mod webhook;

pub use gemini::GeminiClient;
pub use vapi::{CallbackService, VapiClient};
pub use weather::WeatherClient;
pub use webhook::{RegistrationHook, RegistrationPayload, WebhookClient};
