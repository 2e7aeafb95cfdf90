use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use ledger::{
    Collection, Store, decode, decode_all, encode,
    models::{LoginInput, PublicUser, SignupInput, USER_SECRETS, User, touch},
};
use mongodb::bson::{Document, doc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    auth::{Subject, TokenKind, TokenPair, hash_password, verify_password},
    error::AppError,
    state::AppState,
    utils::{PageQuery, Payload, QueryParams, Success, created, find_or_404, success},
};

const USER_NOT_FOUND: &str = "user not found";
const BAD_CREDENTIALS: &str = "invalid email or password";

#[derive(Debug, Serialize)]
pub struct UserPage {
    pub total_count: u64,
    pub users: Vec<PublicUser>,
}

/// Public user view plus a fresh token pair.
#[derive(Debug, Serialize)]
pub struct SignedInUser {
    #[serde(flatten)]
    pub user: PublicUser,
    pub access_token: String,
    pub refresh_token: String,
}

impl SignedInUser {
    fn new(user: User, tokens: TokenPair) -> Self {
        Self {
            user: user.into(),
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshInput {
    pub refresh_token: Option<String>,
}

async fn store_tokens(store: &dyn Store, user_id: &str, tokens: &TokenPair) -> Result<(), AppError> {
    let mut set = Document::new();
    set.insert("access_token", tokens.access_token.as_str());
    set.insert("refresh_token", tokens.refresh_token.as_str());
    touch(&mut set, Utc::now());

    store.update_by_id(Collection::User, user_id, set).await?;
    Ok(())
}

pub async fn list_users(
    State(state): State<Arc<AppState>>,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<Success<UserPage>>, AppError> {
    let (start, limit) = query.window();
    let page = state
        .store
        .page(Collection::User, start, limit, &USER_SECRETS)
        .await?;

    Ok(success(UserPage {
        total_count: page.total_count,
        users: decode_all(page.items)?,
    }))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Success<PublicUser>>, AppError> {
    let user: User =
        find_or_404(state.store.as_ref(), Collection::User, &user_id, USER_NOT_FOUND).await?;

    Ok(success(user.into()))
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<SignupInput>,
) -> Result<impl IntoResponse, AppError> {
    input.validate()?;

    let email = input.email.as_deref().unwrap_or_default().to_lowercase();
    if state
        .store
        .count(Collection::User, doc! { "email": email.as_str() })
        .await?
        > 0
    {
        return Err(AppError::Conflict(format!("email {email} is already in use")));
    }

    let password_hash = hash_password(input.password.clone().unwrap_or_default()).await?;
    let mut user = input.into_user(password_hash, Utc::now())?;

    let tokens = state.signer.issue_pair(&Subject::from(&user))?;
    user.access_token = Some(tokens.access_token.clone());
    user.refresh_token = Some(tokens.refresh_token.clone());

    state.store.insert_one(Collection::User, encode(&user)?).await?;

    info!("Signed up user {}", user.user_id);
    Ok(created(SignedInUser::new(user, tokens)))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<LoginInput>,
) -> Result<Json<Success<SignedInUser>>, AppError> {
    let (email, password) = input.credentials()?;

    let Some(document) = state
        .store
        .find_one(Collection::User, doc! { "email": email.as_str() })
        .await?
    else {
        return Err(AppError::InvalidCredentials(BAD_CREDENTIALS));
    };

    let user: User = decode(document)?;
    if !verify_password(user.password.clone(), password).await? {
        warn!("Failed login for user {}", user.user_id);
        return Err(AppError::InvalidCredentials(BAD_CREDENTIALS));
    }

    let tokens = state.signer.issue_pair(&Subject::from(&user))?;
    store_tokens(state.store.as_ref(), &user.user_id, &tokens).await?;

    info!("Logged in user {}", user.user_id);
    Ok(success(SignedInUser::new(user, tokens)))
}

/// Trades the latest refresh token for a new pair. Older refresh tokens stop
/// working as soon as a newer pair is stored.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Payload(input): Payload<RefreshInput>,
) -> Result<Json<Success<TokenPair>>, AppError> {
    let token = input
        .refresh_token
        .ok_or(ledger::ValidationError::required("refresh_token"))?;
    let claims = state.signer.verify(&token, TokenKind::Refresh)?;

    let user: User = find_or_404(
        state.store.as_ref(),
        Collection::User,
        &claims.subject.user_id,
        USER_NOT_FOUND,
    )
    .await?;

    if user.refresh_token.as_deref() != Some(token.as_str()) {
        return Err(AppError::Unauthorized("refresh token revoked".to_string()));
    }

    let tokens = state.signer.issue_pair(&Subject::from(&user))?;
    store_tokens(state.store.as_ref(), &user.user_id, &tokens).await?;

    Ok(success(tokens))
}
