//! Client HTTP de la file d'attente (accueil, panneau TV, CLI).
//!
//! - [`QueueClient`] : appels REST et abonnement au flux SSE ;
//! - [`SseDecoder`] : découpe d'un flux `text/event-stream` en messages ;
//! - [`RegistrationForm`] : soumission d'une fiche avec garde anti double envoi.

use crate::bus::{EventPayload, QueueEventEnvelope};
use crate::model::{HistoryFilter, NewServiceRecord, ServiceRecord};
use crate::{Error, ErrorResponse, Result};
use futures::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client REST de `/api/queue`
#[derive(Debug, Clone)]
pub struct QueueClient {
    base_url: String,
    http: Client,
    timeout: Duration,
}

impl QueueClient {
    /// Crée un client vers `base_url` (ex: `http://127.0.0.1:8080`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Le délai s'applique aux requêtes REST, pas au flux SSE
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = Client::builder()
            .connect_timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/queue{}", self.base_url, path)
    }

    /// Véhicules en attente (du plus récent au plus ancien)
    pub async fn fetch_queue(&self) -> Result<Vec<ServiceRecord>> {
        let resp = self
            .http
            .get(self.url(""))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;
        decode(check(resp, None).await?).await
    }

    pub async fn get(&self, id: i64) -> Result<ServiceRecord> {
        let resp = self
            .http
            .get(self.url(&format!("/{}", id)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;
        decode(check(resp, Some(id)).await?).await
    }

    pub async fn register(&self, new: &NewServiceRecord) -> Result<ServiceRecord> {
        let resp = self
            .http
            .post(self.url(""))
            .timeout(self.timeout)
            .json(new)
            .send()
            .await
            .map_err(transport)?;
        decode(check(resp, None).await?).await
    }

    pub async fn finalize(&self, id: i64) -> Result<ServiceRecord> {
        let resp = self
            .http
            .post(self.url(&format!("/{}/finalize", id)))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;
        decode(check(resp, Some(id)).await?).await
    }

    pub async fn history(&self, filter: &HistoryFilter) -> Result<Vec<ServiceRecord>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(from) = filter.from {
            query.push(("from", from.to_rfc3339()));
        }
        if let Some(to) = filter.to {
            query.push(("to", to.to_rfc3339()));
        }
        if let Some(plate) = &filter.plate {
            query.push(("plate", plate.clone()));
        }

        let resp = self
            .http
            .get(self.url("/history"))
            .query(&query)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(transport)?;
        decode(check(resp, None).await?).await
    }

    /// S'abonne au flux SSE `/api/queue/events`
    ///
    /// Le flux se termine quand le serveur ferme la connexion ; c'est à
    /// l'appelant de se reconnecter.
    pub async fn subscribe(
        &self,
    ) -> Result<impl Stream<Item = Result<QueueEventEnvelope>> + Send + 'static> {
        let resp = self
            .http
            .get(self.url("/events"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(transport)?;
        let resp = check(resp, None).await?;
        debug!("Subscribed to {}", self.url("/events"));

        let mut bytes = resp.bytes_stream();
        Ok(async_stream::stream! {
            let mut decoder = SseDecoder::new();
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for message in decoder.push(&chunk) {
                            match decode_event(&message) {
                                Ok(Some(envelope)) => yield Ok(envelope),
                                Ok(None) => {}
                                Err(e) => yield Err(e),
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(transport(e));
                        break;
                    }
                }
            }
        })
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
        (StatusCode::CONFLICT, Some(id)) => Error::AlreadyFinalized(id),
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
        .map_err(|e| Error::Payload(e.to_string()))
}

/// Message SSE complet (champ `event` et lignes `data` concaténées)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    pub event: Option<String>,
    pub data: String,
}

/// Décodeur incrémental de flux `text/event-stream`
///
/// Les morceaux reçus peuvent couper une ligne (ou un caractère UTF-8)
/// n'importe où : seules les lignes complètes sont interprétées.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ajoute un morceau et retourne les messages terminés
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.extend_from_slice(chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);

            if line.is_empty() {
                if let Some(message) = self.dispatch() {
                    messages.push(message);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line.as_ref(), ""),
            };
            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => {}
            }
        }
        messages
    }

    fn dispatch(&mut self) -> Option<SseMessage> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseMessage { event, data })
    }
}

/// Interprète un message SSE de la file
///
/// Les évènements inconnus sont ignorés (`Ok(None)`).
pub fn decode_event(message: &SseMessage) -> Result<Option<QueueEventEnvelope>> {
    let Some(name) = message.event.as_deref() else {
        return Ok(None);
    };

    let payload: EventPayload = serde_json::from_str(&message.data)
        .map_err(|e| Error::Payload(format!("{} event: {}", name, e)))?;

    let envelope = QueueEventEnvelope::from_payload(name, payload);
    if envelope.is_none() {
        warn!("Ignoring unknown queue event: {}", name);
    }
    Ok(envelope)
}

/// Échec de soumission d'une fiche depuis l'accueil
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Invalid form: {0}")]
    Invalid(String),

    #[error("Server rejected the request: {0}")]
    Server(String),

    #[error("Server unavailable: {0}")]
    Unavailable(String),

    #[error("A submission is already in flight")]
    InFlight,
}

impl From<Error> for SubmitError {
    fn from(error: Error) -> Self {
        match error {
            Error::InvalidInput { .. } => SubmitError::Invalid(error.to_string()),
            Error::Transport(message) => SubmitError::Unavailable(message),
            other => SubmitError::Server(other.to_string()),
        }
    }
}

/// Formulaire d'enregistrement de l'accueil
///
/// Une nouvelle soumission n'est refusée que pendant qu'une requête est en
/// cours ; après succès ou échec le formulaire est de nouveau disponible.
pub struct RegistrationForm {
    client: QueueClient,
    in_flight: AtomicBool,
}

struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RegistrationForm {
    pub fn new(client: QueueClient) -> Self {
        Self {
            client,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Valide localement puis envoie la fiche
    pub async fn submit(
        &self,
        new: &NewServiceRecord,
    ) -> std::result::Result<ServiceRecord, SubmitError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SubmitError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let normalized = new.normalized()?;
        Ok(self.client.register(&normalized).await?)
    }
}
