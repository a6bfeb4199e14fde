//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::{LoginForm, SignupForm, UserProfile};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::accounts::AuthResponse;
use crate::AppState;

/// Signup endpoint handler; signs the new user in
pub async fn signup(
    State(state): State<AppState>,
    Json(form): Json<SignupForm>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let response = state.accounts.signup(form).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(form): Json<LoginForm>,
) -> AppResult<Json<AuthResponse>> {
    Ok(Json(state.accounts.login(form).await?))
}

/// Logout tears down the user's dashboard
pub async fn logout(State(state): State<AppState>, current_user: CurrentUser) -> StatusCode {
    state.dashboards.remove(current_user.0.user_id).await;
    StatusCode::NO_CONTENT
}

/// Profile of the signed-in user
pub async fn me(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<UserProfile>> {
    Ok(Json(state.accounts.profile(current_user.0.user_id).await?))
}
