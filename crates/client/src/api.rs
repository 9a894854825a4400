use reqwest::{Client, Method, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use url::Url;

use madarij_core::types::{Notification, NotificationsResponse, UnreadCountResponse};

use crate::session::Session;

/// HTTP client for the notification endpoints.
#[derive(Clone)]
pub struct NotificationsApi {
    http: Client,
    base_url: Url,
    session: Session,
}

impl NotificationsApi {
    /// Creates a new client rooted at `base_url` (the server origin).
    pub fn new(base_url: Url, session: Session, http: Client) -> Self {
        Self {
            http,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Fetches every notification of the signed-in user.
    pub async fn list(&self) -> Result<Vec<Notification>, ClientError> {
        let url = self.endpoint(&["api", "notifications"])?;
        let response = self.authorized_request(Method::GET, url)?.send().await?;

        parse_json::<NotificationsResponse>(response)
            .await
            .map(|body| body.notifications)
    }

    /// Fetches the unread counter without the list payload.
    pub async fn unread_count(&self) -> Result<u64, ClientError> {
        let url = self.endpoint(&["api", "notifications", "unread-count"])?;
        let response = self.authorized_request(Method::GET, url)?.send().await?;

        parse_json::<UnreadCountResponse>(response)
            .await
            .map(|body| body.count)
    }

    /// Marks one notification as read.
    pub async fn mark_as_read(&self, id: &str) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "notifications", id, "read"])?;
        let response = self.authorized_request(Method::PUT, url)?.send().await?;

        ensure_success(response).await
    }

    /// Marks every notification of the signed-in user as read.
    pub async fn mark_all_as_read(&self) -> Result<(), ClientError> {
        let url = self.endpoint(&["api", "notifications", "read-all"])?;
        let response = self.authorized_request(Method::PUT, url)?.send().await?;

        ensure_success(response).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized_request(
        &self,
        method: Method,
        url: Url,
    ) -> Result<reqwest::RequestBuilder, ClientError> {
        let token = self
            .session
            .bearer_token()
            .ok_or(ClientError::MissingCredential)?;
        Ok(self
            .http
            .request(method, url)
            .header("Authorization", format!("Bearer {token}")))
    }
}

/// Errors produced by the notifications client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("base url cannot carry path segments: {0}")]
    InvalidBaseUrl(String),
    #[error("no bearer credential in session")]
    MissingCredential,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status}")]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
}

impl ClientError {
    /// Human-readable message supplied by the server, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

async fn error_from(response: Response) -> ClientError {
    let status = response.status();
    let message = response
        .text()
        .await
        .ok()
        .and_then(|body| serde_json::from_str::<ErrorBody>(&body).ok())
        .and_then(|body| body.message);
    ClientError::Status { status, message }
}

async fn ensure_success(response: Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }
    Ok(())
}

async fn parse_json<T>(response: Response) -> Result<T, ClientError>
where
    T: DeserializeOwned,
{
    if !response.status().is_success() {
        return Err(error_from(response).await);
    }

    Ok(response.json().await?)
}
