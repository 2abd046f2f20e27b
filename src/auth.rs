use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{
    Json,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, request::Parts},
};
use time::OffsetDateTime;
use tower_sessions::Session;
use uuid::Uuid;

use crate::AppState;
use crate::constants::*;
use crate::database::Db;
use crate::models::{LoginPayload, PublicUser, RegisterPayload, User};

/// Identity of the caller for one request.
///
/// Established at login, dropped at logout, and rejected once the session
/// outlives [`SESSION_MAX_AGE_DAYS`] regardless of activity. Every data access
/// is scoped through the user id it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub user_id: String,
    pub username: String,
    pub established_at: i64,
}

impl AuthContext {
    pub fn resolve(
        user_id: Option<String>,
        username: Option<String>,
        established_at: Option<i64>,
        now: i64,
    ) -> Result<Self, (StatusCode, String)> {
        let (Some(user_id), Some(username)) = (user_id, username) else {
            return Err((StatusCode::UNAUTHORIZED, ERR_UNAUTHORIZED.to_string()));
        };
        let Some(established_at) = established_at else {
            return Err((StatusCode::UNAUTHORIZED, ERR_INVALID_SESSION.to_string()));
        };
        if now - established_at > SESSION_MAX_AGE_DAYS * 24 * 60 * 60 {
            return Err((StatusCode::UNAUTHORIZED, ERR_SESSION_EXPIRED.to_string()));
        }
        Ok(AuthContext {
            user_id,
            username,
            established_at,
        })
    }

    pub fn public_user(&self) -> PublicUser {
        PublicUser {
            id: self.user_id.clone(),
            username: self.username.clone(),
        }
    }
}

fn session_error(e: tower_sessions::session::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

impl<S> FromRequestParts<S> for AuthContext
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = (StatusCode, String);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(status, msg)| (status, msg.to_string()))?;

        let user_id: Option<String> = session.get(SESSION_USER_ID).await.map_err(session_error)?;
        let username: Option<String> =
            session.get(SESSION_USERNAME).await.map_err(session_error)?;
        let established_at: Option<i64> = session
            .get(SESSION_ESTABLISHED_AT)
            .await
            .map_err(session_error)?;

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let session_user = user_id.clone();
        match AuthContext::resolve(user_id, username, established_at, now) {
            Ok(auth) => Ok(auth),
            Err(rejection) => {
                if rejection.1 == ERR_SESSION_EXPIRED {
                    tracing::info!("clearing expired session");
                    if let Some(user_id) = session_user {
                        AppState::from_ref(state).forget_user(&user_id);
                    }
                    session.clear().await;
                }
                Err(rejection)
            }
        }
    }
}

pub fn validate_registration(payload: &RegisterPayload) -> Result<(), (StatusCode, String)> {
    if payload.username.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username cannot be empty".to_string(),
        ));
    }
    if payload.username.len() < MIN_USERNAME_LENGTH || payload.username.len() > MAX_USERNAME_LENGTH
    {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Username must be between {} and {} characters",
                MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
            ),
        ));
    }
    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err((
            StatusCode::BAD_REQUEST,
            format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            ),
        ));
    }
    if !payload
        .username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username can only contain alphanumeric characters, underscores, and hyphens"
                .to_string(),
        ));
    }
    Ok(())
}

pub async fn create_user(db: &Db, username: &str, password: &str) -> anyhow::Result<PublicUser> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    let id = Uuid::new_v4().to_string();
    let conn = db.write().await;

    conn.execute(
        "INSERT INTO users (id, name, password_hash) VALUES (?, ?, ?)",
        (id.as_str(), username, hash.as_str()),
    )
    .await?;

    Ok(PublicUser {
        id,
        username: username.to_string(),
    })
}

pub async fn get_user_by_username(db: &Db, username: &str) -> anyhow::Result<Option<User>> {
    let conn = db.read().await;
    let mut rows = conn
        .query(
            "SELECT id, name, password_hash FROM users WHERE name = ?",
            [username],
        )
        .await?;

    if let Some(row) = rows.next().await? {
        Ok(Some(User {
            id: row.get(0)?,
            username: row.get(1)?,
            password_hash: row.get(2)?,
        }))
    } else {
        Ok(None)
    }
}

pub fn verify_password(password: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| anyhow::anyhow!("Failed to parse password hash: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    validate_registration(&payload)?;

    let user = create_user(&state.main_db, &payload.username, &payload.password)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                (StatusCode::CONFLICT, "Username already exists".to_string())
            } else {
                tracing::error!(error = %e, "user registration failed");
                (StatusCode::INTERNAL_SERVER_ERROR, ERR_DATABASE_OPERATION.to_string())
            }
        })?;

    state.user_db_for(&user.id).await?;
    tracing::info!(user_id = %user.id, "registered user");

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<LoginPayload>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    if payload.username.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Username cannot be empty".to_string(),
        ));
    }
    if payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Password cannot be empty".to_string(),
        ));
    }

    let user = get_user_by_username(&state.main_db, &payload.username)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "user lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, ERR_DATABASE_ACCESS.to_string())
        })?
        .ok_or_else(|| (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()))?;

    let is_valid = verify_password(&payload.password, &user.password_hash)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if !is_valid {
        tracing::warn!(username = %payload.username, "rejected login");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()));
    }

    session.cycle_id().await.map_err(session_error)?;
    session
        .insert(SESSION_USER_ID, &user.id)
        .await
        .map_err(session_error)?;
    session
        .insert(SESSION_USERNAME, &user.username)
        .await
        .map_err(session_error)?;
    session
        .insert(
            SESSION_ESTABLISHED_AT,
            OffsetDateTime::now_utc().unix_timestamp(),
        )
        .await
        .map_err(session_error)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok((
        StatusCode::OK,
        Json(PublicUser {
            id: user.id,
            username: user.username,
        }),
    ))
}

pub async fn me(auth: AuthContext) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    Ok((StatusCode::OK, Json(auth.public_user())))
}

pub async fn logout(
    State(state): State<AppState>,
    session: Session,
) -> Result<StatusCode, (StatusCode, String)> {
    let user_id: Option<String> = session.get(SESSION_USER_ID).await.map_err(session_error)?;
    if let Some(user_id) = user_id {
        state.forget_user(&user_id);
        tracing::info!(%user_id, "user logged out");
    }
    session.clear().await;

    Ok(StatusCode::NO_CONTENT)
}
