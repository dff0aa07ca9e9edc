//! Client HTTP de la playlist média (panneau TV, CLI).

use crate::model::{NewPlaylistItem, PlaylistItem};
use crate::{Error, ErrorResponse, Result};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client REST de `/api/media/playlist`
#[derive(Debug, Clone)]
pub struct MediaClient {
    base_url: String,
    http: Client,
}

impl MediaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/media/playlist{}", self.base_url, path)
    }

    /// Playlist dans l'ordre de diffusion
    pub async fn fetch_playlist(&self) -> Result<Vec<PlaylistItem>> {
        let resp = self.http.get(self.url("")).send().await.map_err(transport)?;
        decode(check(resp, None).await?).await
    }

    pub async fn add(&self, item: &NewPlaylistItem) -> Result<PlaylistItem> {
        let resp = self
            .http
            .post(self.url(""))
            .json(item)
            .send()
            .await
            .map_err(transport)?;
        decode(check(resp, None).await?).await
    }

    pub async fn update(&self, id: i64, item: &NewPlaylistItem) -> Result<PlaylistItem> {
        let resp = self
            .http
            .put(self.url(&format!("/{}", id)))
            .json(item)
            .send()
            .await
            .map_err(transport)?;
        decode(check(resp, Some(id)).await?).await
    }

    pub async fn remove(&self, id: i64) -> Result<()> {
        let resp = self
            .http
            .delete(self.url(&format!("/{}", id)))
            .send()
            .await
            .map_err(transport)?;
        check(resp, Some(id)).await?;
        Ok(())
    }
}

fn transport(e: reqwest::Error) -> Error {
    Error::Transport(e.to_string())
}

async fn check(resp: Response, id: Option<i64>) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|e| e.message)
        .unwrap_or(body);

    Err(match (status, id) {
        (StatusCode::NOT_FOUND, Some(id)) => Error::NotFound(id),
        (StatusCode::BAD_REQUEST, _) | (StatusCode::UNPROCESSABLE_ENTITY, _) => {
            Error::InvalidInput {
                field: "request".into(),
                reason: message,
            }
        }
        _ => Error::Server {
            status: status.as_u16(),
            message,
        },
    })
}

async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T> {
    resp.json::<T>()
        .await
        .map_err(|e| Error::Server {
            status: 200,
            message: format!("Unexpected payload: {}", e),
        })
}
