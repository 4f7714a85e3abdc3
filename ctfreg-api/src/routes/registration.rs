/// Registration endpoints
///
/// # Endpoints
///
/// - `GET /v1/register` - Field descriptions of both registration forms
/// - `POST /v1/register` - Register a user and its team
/// - `GET /confirm-email` - Activate an account from the mailed link

use crate::{
    app::AppState,
    config::Config,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::QueryRejection,
        Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    Json,
};
use ctfreg_shared::{
    auth::token::TokenError,
    forms::{
        FieldDescriptor, TeamProfileData, TeamProfileForm, UserCredentialsData,
        UserCredentialsForm,
    },
    mail::RequestSite,
    media::ImageUpload,
    models::user::User,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Field descriptions response
#[derive(Debug, Serialize)]
pub struct FormFieldsResponse {
    pub user: &'static [FieldDescriptor],
    pub team: &'static [FieldDescriptor],
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub team_id: Uuid,
    pub username: String,

    /// Always false until the formal email is confirmed
    pub is_active: bool,
}

/// Query of the confirmation link
#[derive(Debug, Deserialize)]
pub struct ConfirmParams {
    pub user: Uuid,
    pub token: String,
}

/// Confirmation response
#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmResponse {
    pub user_id: Uuid,
    pub is_active: bool,
}

/// Registration input, split into the parts of the two forms
#[derive(Debug, Default)]
struct Submission {
    user: UserCredentialsData,
    team: TeamProfileData,
    image: Option<ImageUpload>,
}

impl Submission {
    async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut submission = Submission::default();

        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == "image" {
                let file_name = field.file_name().filter(|n| !n.is_empty()).map(str::to_string);
                let data = field.bytes().await.map_err(bad_multipart)?;

                // Browsers send an empty part when no file was chosen
                if file_name.is_some() || !data.is_empty() {
                    submission.image = Some(ImageUpload::new(file_name, data));
                }
                continue;
            }

            let value = field.text().await.map_err(bad_multipart)?;
            match name.as_str() {
                "username" => submission.user.username = value,
                "password" => submission.user.password = value,
                "email" => submission.user.email = value,
                "informal_email" => submission.team.informal_email = value,
                "country" => submission.team.country = value,
                _ => {}
            }
        }

        Ok(submission)
    }
}

fn bad_multipart(err: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(format!("Invalid multipart body: {}", err))
}

/// Works out scheme and host for links pointing back at this site
///
/// The configured site domain wins over the `Host` header. Otherwise the
/// `Host` header must match `ALLOWED_HOSTS`, since it ends up in mailed
/// links. The request only counts as secure if `X-Forwarded-Proto` is
/// trusted and says `https`.
pub fn request_site(headers: &HeaderMap, config: &Config) -> ApiResult<RequestSite> {
    let host = match &config.registration.site_domain {
        Some(domain) => domain.clone(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::BadRequest("Missing Host header".to_string()))?;

            if !host_allowed(host, &config.api.allowed_hosts) {
                warn!(host, "Rejected request for a host not in ALLOWED_HOSTS");
                return Err(ApiError::BadRequest(format!("Invalid Host header: {}", host)));
            }
            host.to_string()
        }
    };

    let secure = config.api.trust_forwarded_proto
        && headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false);

    Ok(RequestSite::new(secure, host))
}

/// Matches a `Host` header value against allowed host patterns
///
/// The port is ignored. A pattern with a leading dot matches the domain and
/// its subdomains, `*` matches anything.
fn host_allowed(host: &str, allowed: &[String]) -> bool {
    let host = host.to_ascii_lowercase();
    let domain = if host.starts_with('[') {
        host.split_inclusive(']').next().unwrap_or(&host)
    } else {
        host.rsplit_once(':').map_or(host.as_str(), |(domain, _)| domain)
    };
    let domain = domain.trim_end_matches('.');

    allowed.iter().any(|pattern| {
        pattern == "*"
            || pattern == domain
            || pattern
                .strip_prefix('.')
                .is_some_and(|parent| domain == parent || domain.ends_with(pattern.as_str()))
    })
}

/// Describe the registration forms
///
/// # Endpoint
///
/// ```text
/// GET /v1/register
/// ```
pub async fn form_fields() -> Json<FormFieldsResponse> {
    Json(FormFieldsResponse {
        user: UserCredentialsForm::fields(),
        team: TeamProfileForm::fields(),
    })
}

/// Register a user and its team
///
/// Both forms are validated before anything is written, and the errors of
/// both are reported together. The user is saved inactive, the team is bound
/// to it and a confirmation mail goes to the formal address.
///
/// # Endpoint
///
/// ```text
/// POST /v1/register
/// Content-Type: multipart/form-data
///
/// username, password, email, informal_email, country, image (optional file)
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "user_id": "uuid",
///   "team_id": "uuid",
///   "username": "alice",
///   "is_active": false
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Body is not valid multipart, or `Host` not in
///   `ALLOWED_HOSTS`
/// - `422 Unprocessable Entity`: Field errors of either form
/// - `409 Conflict`: The team record collided with an existing one
/// - `500 Internal Server Error`: Storing the team or sending the mail
///   failed; the user is removed again so the name can be reused
pub async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let site = request_site(&headers, &state.config)?;
    let multipart = multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let submission = Submission::read(multipart).await?;

    let store = state.store.as_ref();
    let mut user_form = UserCredentialsForm::new(submission.user);
    let team_form = TeamProfileForm::new(submission.team)
        .with_image(submission.image)
        .with_max_image_bytes(state.media.max_image_bytes());

    let mut errors = user_form.errors(store).await?;
    errors.merge(team_form.errors());
    if !errors.is_empty() {
        info!(%errors, "Rejected registration");
        return Err(errors.into());
    }

    let user = user_form.save(store).await?;

    let team = match team_form.save(store, &state.media, &user).await {
        Ok(team) => team,
        Err(e) => {
            discard_registration(&state, &user, None).await;
            return Err(e.into());
        }
    };

    if let Err(e) = user_form
        .send_confirmation_mail(&site, &state.confirmation)
        .await
    {
        discard_registration(&state, &user, team.image.as_deref()).await;
        return Err(e.into());
    }

    info!(
        user_id = %user.id,
        team_id = %team.id,
        username = %user.username,
        "Registered team, awaiting email confirmation"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            team_id: team.id,
            username: user.username,
            is_active: user.is_active,
        }),
    ))
}

/// Rolls back a half-finished registration
///
/// Without this, the inactive user would keep its username while no mail
/// could ever activate it.
async fn discard_registration(state: &AppState, user: &User, image: Option<&str>) {
    match state.store.delete_user(user.id).await {
        Ok(_) => warn!(user_id = %user.id, username = %user.username, "Discarded unfinished registration"),
        Err(e) => error!(user_id = %user.id, error = %e, "Failed to discard unfinished registration"),
    }

    if let Some(path) = image {
        if let Err(e) = state.media.remove(path).await {
            warn!(error = %e, "Failed to remove image of discarded registration");
        }
    }
}

/// Activate an account from the confirmation link
///
/// # Endpoint
///
/// ```text
/// GET /confirm-email?user=<uuid>&token=<token>
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Token malformed, invalid, expired or already used
/// - `404 Not Found`: Unknown user
pub async fn confirm_email(
    State(state): State<AppState>,
    params: Result<Query<ConfirmParams>, QueryRejection>,
) -> ApiResult<Json<ConfirmResponse>> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let store = state.store.as_ref();

    let user = store
        .find_user(params.user)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if let Err(e) = state.confirmation.tokens().check_token(&user, &params.token) {
        warn!(user_id = %user.id, error = %e, "Rejected confirmation token");
        return Err(match e {
            TokenError::Key(msg) => ApiError::InternalError(msg),
            other => ApiError::BadRequest(other.to_string()),
        });
    }

    // A concurrent confirmation may have won in between
    let user = store
        .activate_user(user.id)
        .await?
        .ok_or_else(|| ApiError::BadRequest(TokenError::Invalid.to_string()))?;

    info!(user_id = %user.id, username = %user.username, "Confirmed email, user activated");

    Ok(Json(ConfirmResponse {
        user_id: user.id,
        is_active: user.is_active,
    }))
}
