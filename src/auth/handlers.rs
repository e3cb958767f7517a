use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use serde_json::{Value, json};
use storefront::schema::{password_reset_otps, users};
use uuid::Uuid;
use validator::Validate;

use super::models::{
    AccessTokenClaims, ChangePasswordPayload, ForgotPasswordPayload, LoginPayload, NewPasswordResetOtp,
    NewUser, PasswordResetOtp, RefreshPayload, RefreshTokenClaims, ResetPasswordPayload, ROLE_CUSTOMER,
    SignupPayload, TokenPair, User, VerifyOtpPayload,
};
use crate::config::AuthConfig;
use crate::notification::models::{Notification, PasswordResetNotification, WelcomeNotification};
use crate::state::AppState;
use crate::utils::error::{ApiError, is_unique_violation};
use crate::utils::types::Conn;

pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupPayload>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    payload.validate()?;

    if payload.password != payload.confirm_password {
        return Err(ApiError::Validation("passwords do not match".to_owned()));
    }

    let mut conn = state.pool.get().await?;

    let password_hash = hash_secret(payload.password).await?;

    let new_user = NewUser {
        id: Uuid::new_v4(),
        email: payload.email,
        password_hash,
        phone: payload.phone,
        role: ROLE_CUSTOMER.to_owned(),
    };

    let user = diesel::insert_into(users::table)
        .values(&new_user)
        .returning(User::as_returning())
        .get_result::<User>(&mut conn)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::Conflict("email already registered".to_owned())
            } else {
                e.into()
            }
        })?;

    let tokens = issue_tokens(&state.config.auth, &user)?;
    persist_refresh_token(&mut conn, user.id, &tokens.refresh).await?;

    let welcome = Notification::WelcomeUser(WelcomeNotification {
        email: user.email.clone(),
    });
    if let Err(e) = state.mailer.send(welcome).await {
        tracing::warn!(error = %e, "failed to send welcome email");
    }

    tracing::info!(user_id = %user.id, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully", "tokens": tokens })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    let mut conn = state.pool.get().await?;

    // Unknown email and wrong password are indistinguishable on purpose.
    let user = users::table
        .filter(users::email.eq(&payload.email))
        .select(User::as_select())
        .first::<User>(&mut conn)
        .await
        .optional()?
        .ok_or_else(invalid_credentials)?;

    if !verify_secret(payload.password, user.password_hash.clone()).await? {
        return Err(invalid_credentials());
    }

    let tokens = issue_tokens(&state.config.auth, &user)?;
    persist_refresh_token(&mut conn, user.id, &tokens.refresh).await?;

    Ok(Json(json!({ "message": "Login successful", "tokens": tokens })))
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshPayload>,
) -> Result<Json<Value>, ApiError> {
    let data = decode::<RefreshTokenClaims>(
        &payload.refresh_token,
        &DecodingKey::from_secret(state.config.auth.refresh_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| ApiError::Unauthorized(format!("invalid refresh token: {}", e)))?;

    let user_id = Uuid::parse_str(&data.claims.sub)
        .map_err(|_| ApiError::Unauthorized("malformed subject claim".to_owned()))?;

    let mut conn = state.pool.get().await?;

    let user = users::table
        .find(user_id)
        .select(User::as_select())
        .first::<User>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::Unauthorized("unknown user".to_owned()))?;

    let hashed_rt = user
        .hashed_rt
        .clone()
        .ok_or_else(|| ApiError::Unauthorized("session revoked".to_owned()))?;

    if !verify_secret(token_fingerprint(&payload.refresh_token), hashed_rt).await? {
        return Err(ApiError::Unauthorized("refresh token revoked".to_owned()));
    }

    let tokens = issue_tokens(&state.config.auth, &user)?;
    persist_refresh_token(&mut conn, user.id, &tokens.refresh).await?;

    Ok(Json(json!({ "message": "Token refreshed", "tokens": tokens })))
}

pub async fn logout(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
) -> Result<Json<Value>, ApiError> {
    let user_id = claims.user_id()?;

    let mut conn = state.pool.get().await?;

    diesel::update(users::table.find(user_id))
        .set(users::hashed_rt.eq(None::<String>))
        .execute(&mut conn)
        .await?;

    Ok(Json(json!({ "message": "Logged out" })))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    let mut conn = state.pool.get().await?;

    let user = users::table
        .filter(users::email.eq(&payload.email))
        .select(User::as_select())
        .first::<User>(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::Validation("no account found with this email".to_owned()))?;

    let code = generate_otp_code();

    let new_otp = NewPasswordResetOtp {
        user_id: user.id,
        code: code.clone(),
    };

    diesel::insert_into(password_reset_otps::table)
        .values(&new_otp)
        .execute(&mut conn)
        .await?;

    state
        .mailer
        .send(Notification::PasswordReset(PasswordResetNotification {
            email: user.email.clone(),
            code,
        }))
        .await?;

    tracing::info!(user_id = %user.id, "password reset otp issued");

    Ok(Json(json!({ "message": "OTP sent successfully" })))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpPayload>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    let mut conn = state.pool.get().await?;

    let otp = latest_unused_otp(&mut conn, &payload.email, &payload.otp).await?;

    diesel::update(password_reset_otps::table.find(otp.id))
        .set(password_reset_otps::is_used.eq(true))
        .execute(&mut conn)
        .await?;

    Ok(Json(json!({ "message": "OTP verified successfully" })))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    if payload.new_password != payload.confirm_password {
        return Err(ApiError::Validation("passwords do not match".to_owned()));
    }

    let mut conn = state.pool.get().await?;

    let otp = latest_unused_otp(&mut conn, &payload.email, &payload.otp).await?;

    let password_hash = hash_secret(payload.new_password).await?;

    let user_id = otp.user_id;
    let otp_id = otp.id;
    conn.transaction::<(), diesel::result::Error, _>(|conn| {
        Box::pin(async move {
            diesel::update(users::table.find(user_id))
                .set(users::password_hash.eq(&password_hash))
                .execute(conn)
                .await?;

            diesel::update(password_reset_otps::table.find(otp_id))
                .set(password_reset_otps::is_used.eq(true))
                .execute(conn)
                .await?;

            Ok(())
        })
    })
    .await?;

    tracing::info!(user_id = %user_id, "password reset completed");

    Ok(Json(json!({ "message": "Password reset successful" })))
}

pub async fn change_password(
    State(state): State<AppState>,
    claims: AccessTokenClaims,
    Json(payload): Json<ChangePasswordPayload>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    let user_id = claims.user_id()?;

    let mut conn = state.pool.get().await?;

    let user = users::table
        .find(user_id)
        .select(User::as_select())
        .first::<User>(&mut conn)
        .await?;

    if !verify_secret(payload.old_password, user.password_hash.clone()).await? {
        return Err(ApiError::Validation("old password is incorrect".to_owned()));
    }

    if payload.new_password != payload.confirm_password {
        return Err(ApiError::Validation("passwords do not match".to_owned()));
    }

    let password_hash = hash_secret(payload.new_password).await?;

    diesel::update(users::table.find(user_id))
        .set(users::password_hash.eq(&password_hash))
        .execute(&mut conn)
        .await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

/// Most recent unused OTP for the account, matched by code. Unknown email,
/// wrong code and a consumed code all collapse into the same rejection.
async fn latest_unused_otp(
    conn: &mut Conn<'_>,
    email: &str,
    code: &str,
) -> Result<PasswordResetOtp, ApiError> {
    let invalid = || ApiError::Validation("invalid or expired OTP".to_owned());

    let user = users::table
        .filter(users::email.eq(email))
        .select(User::as_select())
        .first::<User>(conn)
        .await
        .optional()?
        .ok_or_else(invalid)?;

    password_reset_otps::table
        .filter(password_reset_otps::user_id.eq(user.id))
        .filter(password_reset_otps::code.eq(code))
        .filter(password_reset_otps::is_used.eq(false))
        .order(password_reset_otps::created_at.desc())
        .select(PasswordResetOtp::as_select())
        .first::<PasswordResetOtp>(conn)
        .await
        .optional()?
        .ok_or_else(invalid)
}

fn issue_tokens(cfg: &AuthConfig, user: &User) -> Result<TokenPair, ApiError> {
    let now = Utc::now().timestamp();

    let access_claims = AccessTokenClaims {
        sub: user.id.to_string(),
        role: user.role.clone(),
        iat: now,
        exp: now + cfg.access_ttl_secs,
    };

    let refresh_claims = RefreshTokenClaims {
        sub: user.id.to_string(),
        iat: now,
        exp: now + cfg.refresh_ttl_secs,
    };

    let access = encode(
        &Header::default(),
        &access_claims,
        &EncodingKey::from_secret(cfg.access_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign access token: {}", e)))?;

    let refresh = encode(
        &Header::default(),
        &refresh_claims,
        &EncodingKey::from_secret(cfg.refresh_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("failed to sign refresh token: {}", e)))?;

    Ok(TokenPair { access, refresh })
}

async fn persist_refresh_token(
    conn: &mut Conn<'_>,
    user_id: Uuid,
    refresh_token: &str,
) -> Result<(), ApiError> {
    let hashed = hash_secret(token_fingerprint(refresh_token)).await?;

    diesel::update(users::table.find(user_id))
        .set(users::hashed_rt.eq(hashed))
        .execute(conn)
        .await?;

    Ok(())
}

// bcrypt caps input at 72 bytes; tokens are longer, so hash their digest.
fn token_fingerprint(token: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(token.as_bytes()))
}

async fn hash_secret(secret: String) -> Result<String, ApiError> {
    let hashed = tokio::task::spawn_blocking(move || hash(secret, DEFAULT_COST)).await??;
    Ok(hashed)
}

async fn verify_secret(secret: String, hashed: String) -> Result<bool, ApiError> {
    let matches = tokio::task::spawn_blocking(move || verify(secret, &hashed)).await??;
    Ok(matches)
}

fn invalid_credentials() -> ApiError {
    ApiError::Validation("invalid email or password".to_owned())
}

fn generate_otp_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "shopper@example.com".to_owned(),
            password_hash: "x".to_owned(),
            phone: None,
            role: ROLE_CUSTOMER.to_owned(),
            hashed_rt: None,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn test_config() -> AuthConfig {
        AuthConfig {
            access_secret: "access-secret".to_owned(),
            refresh_secret: "refresh-secret".to_owned(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604_800,
        }
    }

    #[test]
    fn otp_code_is_six_digits() {
        for _ in 0..200 {
            let code = generate_otp_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn access_token_carries_subject_and_role() {
        let cfg = test_config();
        let user = test_user();

        let pair = issue_tokens(&cfg, &user).unwrap();

        let decoded = decode::<AccessTokenClaims>(
            &pair.access,
            &DecodingKey::from_secret(cfg.access_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(decoded.claims.sub, user.id.to_string());
        assert_eq!(decoded.claims.role, ROLE_CUSTOMER);
        assert!(decoded.claims.exp > decoded.claims.iat);
    }

    #[test]
    fn refresh_token_rejected_with_access_secret() {
        let cfg = test_config();
        let pair = issue_tokens(&cfg, &test_user()).unwrap();

        let res = decode::<RefreshTokenClaims>(
            &pair.refresh,
            &DecodingKey::from_secret(cfg.access_secret.as_bytes()),
            &Validation::default(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn token_fingerprint_is_stable_and_short() {
        let token = "header.payload.signature".repeat(10);
        let fp = token_fingerprint(&token);
        assert_eq!(fp, token_fingerprint(&token));
        // fits under bcrypt's 72-byte input cap
        assert_eq!(fp.len(), 64);
    }
}
