//! Validation utilities for the AgroX farm advisory service
//!
//! The same rules run on the server and, through the WASM build, in the
//! browser before a form is submitted.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::models::{LoginForm, SignupForm};

/// A validation failure attached to a form field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Field Validations
// ============================================================================

/// Validate email format.
///
/// Accepts anything shaped like `x@y.z` where none of the three parts
/// contain whitespace.
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Err("Email is required.");
    }
    if looks_like_email(email) {
        Ok(())
    } else {
        Err("Please enter a valid email address.")
    }
}

fn looks_like_email(email: &str) -> bool {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE
        .get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("valid email regex"))
        .is_match(email)
}

/// Validate password strength: 8+ characters with at least one digit
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        return Err("Password is required.");
    }
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters long.");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number.");
    }
    Ok(())
}

/// Validate that a free-text field was filled in
pub fn validate_required(label: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{} is required.", label));
    }
    Ok(())
}

// ============================================================================
// Form Validations
// ============================================================================

/// Validate a signup form, collecting every field error
pub fn validate_signup_form(form: &SignupForm) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if let Err(msg) = validate_required("Full Name", &form.name) {
        errors.push(FieldError::new("name", msg));
    }
    if let Err(msg) = validate_email(&form.email) {
        errors.push(FieldError::new("email", msg));
    }
    if let Err(msg) = validate_required("Phone Number", &form.phone) {
        errors.push(FieldError::new("phone", msg));
    }
    if let Err(msg) = validate_required("Location", &form.location) {
        errors.push(FieldError::new("location", msg));
    }
    if let Err(msg) = validate_password(&form.password) {
        errors.push(FieldError::new("password", msg));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate a login form; only presence of the password is checked
pub fn validate_login_form(form: &LoginForm) -> Result<(), Vec<FieldError>> {
    let mut errors = Vec::new();

    if let Err(msg) = validate_email(&form.email) {
        errors.push(FieldError::new("email", msg));
    }
    if form.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required."));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
