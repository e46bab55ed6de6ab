// REST client for the committee backend.
//
// Every call goes through `request`, which attaches the bearer token, applies
// the configured timeout, maps transport and status failures into the
// `ApiError` taxonomy, and publishes session expiry (401/403) on a watch
// channel that the orchestrator subscribes to. Callers receive normalized
// domain types, never raw payloads.

use std::sync::RwLock;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::types::{
    access_token, data_array, data_object, Candidate, Committee, Draw, DrawWinner, PaidRow,
    Profile,
};

// ---------------------------------------------------------------------------
// Error taxonomy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("session expired")]
    Unauthorized,

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ApiError {
    /// Human-readable message for toasts.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(_) => "Unable to reach the server. Check your connection.".into(),
            ApiError::Timeout(_) => "The server took too long to respond. Retry?".into(),
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Unauthorized => "Your session has expired. Please sign in again.".into(),
            ApiError::Malformed(_) => "The server returned an unexpected response.".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Fields to add a new committee. Optional fields are omitted from the body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewCommittee {
    pub name: String,
    pub amount: f64,
    pub max_members: i64,
    pub no_of_months: i64,
    pub fine_amount: Option<f64>,
    pub extra_days_for_fine: Option<i64>,
    pub start_date: Option<String>,
}

/// Fields to enroll a member into a committee.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewMember {
    pub committee_id: i64,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub password: Option<String>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    token: RwLock<Option<String>>,
    /// Bumped on every 401/403. Subscribers treat a change as "session
    /// expired" and abort in-flight work.
    expiry_tx: watch::Sender<u64>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let (expiry_tx, _) = watch::channel(0);
        ApiClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            token: RwLock::new(None),
            expiry_tx,
        }
    }

    /// Subscribe to session-expiry notifications. Each expiry bumps the
    /// watched counter; the receiver's lifecycle is the subscriber's own.
    pub fn subscribe_expiry(&self) -> watch::Receiver<u64> {
        self.expiry_tx.subscribe()
    }

    pub fn set_token(&self, token: Option<String>) {
        // Lock poisoning only happens if a writer panicked; propagating the
        // inner value is still sound for a plain Option swap.
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(mut poisoned) => **poisoned.get_mut() = token,
        }
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .map(|g| g.is_some())
            .unwrap_or(false)
    }

    fn current_token(&self) -> Option<String> {
        self.token.read().ok().and_then(|g| g.clone())
    }

    // -- low-level request plumbing -----------------------------------------

    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%url, %method, "api request");

        let mut builder = self
            .http
            .request(method, &url)
            .timeout(self.timeout)
            .header("content-type", "application/json");
        if let Some(token) = self.current_token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = body {
            builder = builder.json(&body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(self.timeout)
            } else {
                ApiError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let payload: Value = match response.json().await {
            Ok(v) => v,
            Err(_) if status.is_success() => {
                return Err(ApiError::Malformed("non-JSON body".into()))
            }
            Err(_) => Value::Null,
        };

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = status.as_u16(), "session expired");
            self.expiry_tx.send_modify(|n| *n += 1);
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: extract_error_message(&payload),
            });
        }

        Ok(payload)
    }

    // -- auth ---------------------------------------------------------------

    /// Log in and store the returned bearer token for subsequent calls.
    pub async fn login(&self, phone: &str, password: &str) -> Result<Profile, ApiError> {
        let body = json!({ "phoneNo": phone, "password": password });
        let response = self
            .request(Method::POST, "api/v1/auth/login", Some(body))
            .await?;
        let token = access_token(&response).ok_or_else(|| {
            ApiError::Malformed("login succeeded but no access token was returned".into())
        })?;
        self.set_token(Some(token));
        let profile = Profile::from_value(&response);
        // Some deployments return only the token pair here; fetch the
        // profile separately so the status bar has a name to show.
        if needs_profile_fetch(&profile) {
            return self.profile().await;
        }
        Ok(profile)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self
            .request(Method::POST, "api/v1/auth/logout", Some(json!({})))
            .await;
        self.set_token(None);
        result.map(|_| ())
    }

    pub async fn profile(&self) -> Result<Profile, ApiError> {
        let response = self.request(Method::GET, "api/v1/auth/profile/me", None).await?;
        Ok(Profile::from_value(&response))
    }

    pub async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let body = json!({ "oldPassword": old_password, "newPassword": new_password });
        self.request(Method::PATCH, "api/v1/auth/change-password", Some(body))
            .await
            .map(|_| ())
    }

    // -- committees ---------------------------------------------------------

    pub async fn committees(&self) -> Result<Vec<Committee>, ApiError> {
        let response = self.request(Method::GET, "api/v1/committee/get", None).await?;
        Ok(data_array(&response)
            .iter()
            .filter_map(Committee::from_value)
            .collect())
    }

    pub async fn create_committee(&self, new: &NewCommittee) -> Result<(), ApiError> {
        let mut body = json!({
            "committeeName": new.name,
            "committeeAmount": new.amount,
            "commissionMaxMember": new.max_members,
            "noOfMonths": new.no_of_months,
        });
        if let Some(fine) = new.fine_amount {
            body["fineAmount"] = json!(fine);
        }
        if let Some(days) = new.extra_days_for_fine {
            body["extraDaysForFine"] = json!(days);
        }
        if let Some(ref date) = new.start_date {
            body["startCommitteeDate"] = json!(date);
        }
        self.request(Method::POST, "api/v1/committee/add", Some(body))
            .await
            .map(|_| ())
    }

    pub async fn add_member(&self, new: &NewMember) -> Result<(), ApiError> {
        let mut body = json!({
            "committeeId": new.committee_id,
            "name": new.name,
            "phoneNo": new.phone,
        });
        if let Some(ref email) = new.email {
            if !email.is_empty() {
                body["email"] = json!(email);
            }
        }
        if let Some(ref password) = new.password {
            if !password.is_empty() {
                body["password"] = json!(password);
            }
        }
        self.request(Method::POST, "api/v1/committee/member/add", Some(body))
            .await
            .map(|_| ())
    }

    pub async fn members(&self, committee_id: i64) -> Result<Vec<Candidate>, ApiError> {
        let path = format!("api/v1/committee/member/get?committeeId={committee_id}");
        let response = self.request(Method::GET, &path, None).await?;
        Ok(data_array(&response).iter().map(Candidate::from_value).collect())
    }

    // -- draws --------------------------------------------------------------

    pub async fn draws(&self, committee_id: i64) -> Result<Vec<Draw>, ApiError> {
        let path = format!("api/v1/committee/draw/get?committeeId={committee_id}");
        let response = self.request(Method::GET, &path, None).await?;
        Ok(data_array(&response).iter().filter_map(Draw::from_value).collect())
    }

    pub async fn paid_rows(&self, committee_id: i64, draw_id: i64) -> Result<Vec<PaidRow>, ApiError> {
        let path = format!(
            "api/v1/committee/draw/user-wise-paid?committeeId={committee_id}&drawId={draw_id}"
        );
        let response = self.request(Method::GET, &path, None).await?;
        Ok(data_array(&response).iter().map(PaidRow::from_value).collect())
    }

    /// Commit target of the debounced amount editor. Returns the committed
    /// amount so the caller can update its last-committed record.
    pub async fn update_draw_amount(
        &self,
        committee_id: i64,
        draw_id: i64,
        amount: f64,
    ) -> Result<f64, ApiError> {
        let body = json!({ "committeeId": committee_id, "drawId": draw_id, "amount": amount });
        self.request(Method::PATCH, "api/v1/committee/draw/amount-update", Some(body))
            .await
            .map(|_| amount)
    }

    pub async fn mark_user_draw_paid(
        &self,
        committee_id: i64,
        user_id: i64,
        draw_id: i64,
        amount: f64,
    ) -> Result<f64, ApiError> {
        let body = json!({
            "committeeId": committee_id,
            "userId": user_id,
            "drawId": draw_id,
            "userDrawAmountPaid": amount,
        });
        self.request(Method::PATCH, "api/v1/committee/draw/user-wise-paid", Some(body))
            .await
            .map(|_| amount)
    }

    /// Commit target of the optimistic completed-flag toggle.
    pub async fn toggle_draw_completed(
        &self,
        committee_id: i64,
        draw_id: i64,
        user_id: i64,
        is_draw_completed: bool,
    ) -> Result<(), ApiError> {
        let body = json!({
            "committeeId": committee_id,
            "drawId": draw_id,
            "userId": user_id,
            "isDrawCompleted": is_draw_completed,
        });
        self.request(Method::PATCH, "api/v1/committee/draw/toggle-completed", Some(body))
            .await
            .map(|_| ())
    }

    // -- lottery ------------------------------------------------------------

    /// Fetch the server-chosen winner for a lottery draw. Eligibility
    /// filtering happens server-side; this result is authoritative.
    pub async fn lottery_random_user(&self, committee_id: i64) -> Result<DrawWinner, ApiError> {
        let path = format!("api/v1/committee/lottery-random-user?committeeId={committee_id}");
        let response = self.request(Method::GET, &path, None).await?;
        Ok(DrawWinner::from_value(&data_object(&response)))
    }
}

/// Pull a human-readable message out of an error payload, falling back to a
/// generic string when the body carries nothing usable.
fn extract_error_message(payload: &Value) -> String {
    payload
        .get("message")
        .or_else(|| payload.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| payload.as_str().map(str::to_string))
        .unwrap_or_else(|| "Unexpected error".to_string())
}

/// A login response that carried no identifying fields needs a follow-up
/// profile fetch.
fn needs_profile_fetch(profile: &Profile) -> bool {
    profile.name.is_none() && profile.phone.is_none()
}
