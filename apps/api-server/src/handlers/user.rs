//! Account handlers.

use actix_web::{HttpResponse, web};

use kadha_core::services::{IssuedToken, SignupInput};
use kadha_shared::dto::{AuthResponse, SigninRequest, SignupRequest};

use crate::middleware::error::AppResult;
use crate::state::AppState;

fn auth_response(issued: IssuedToken) -> AuthResponse {
    AuthResponse {
        token: issued.token,
        token_type: "Bearer".to_string(),
        expires_in: issued.expires_in.map(|secs| secs.max(0) as u64),
    }
}

/// POST /user/signup
pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let issued = state
        .accounts
        .signup(SignupInput {
            email: req.email,
            password: req.password,
            name: req.name,
        })
        .await?;

    Ok(HttpResponse::Created().json(auth_response(issued)))
}

/// POST /user/signin
pub async fn signin(
    state: web::Data<AppState>,
    body: web::Json<SigninRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let issued = state.accounts.signin(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok().json(auth_response(issued)))
}
