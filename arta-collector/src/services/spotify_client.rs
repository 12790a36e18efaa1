//! Spotify Web API client
//!
//! Client-credentials authentication with an in-memory token cache, plus a
//! single-result artist search. The cached token is reused while
//! `now < expires_at`; otherwise exactly one refresh happens before the
//! request, under the cache lock.

use arta_common::time::SharedClock;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

pub const SPOTIFY_ACCOUNTS_URL: &str = "https://accounts.spotify.com";
pub const SPOTIFY_API_URL: &str = "https://api.spotify.com";
/// Token lifetime assumed when the auth response omits `expires_in`
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Spotify client errors
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// Credentials rejected or token unobtainable; fatal for an enrichment run
    #[error("Spotify authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}")]
    ApiError(u16),

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl SpotifyError {
    pub fn is_auth(&self) -> bool {
        matches!(self, SpotifyError::Auth(_))
    }
}

/// Client-credentials pair
#[derive(Clone, PartialEq, Eq)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl SpotifyCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// `Basic base64(id:secret)` header value
    fn basic_auth_header(&self) -> String {
        let raw = format!("{}:{}", self.client_id, self.client_secret);
        format!("Basic {}", BASE64.encode(raw))
    }
}

impl fmt::Debug for SpotifyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Top search match for an artist name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyArtist {
    pub name: String,
    pub followers: u64,
    pub popularity: u32,
    pub url: Option<String>,
    /// First (largest) profile image
    pub image: Option<String>,
}

/// Anything that can look up streaming metrics by artist name
#[async_trait]
pub trait PopularitySource: Send + Sync {
    /// Top match for `name`, `Ok(None)` when the service has none
    async fn lookup_artist(&self, name: &str) -> Result<Option<SpotifyArtist>, SpotifyError>;
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    artists: Option<ArtistPage>,
}

#[derive(Debug, Deserialize)]
struct ArtistPage {
    #[serde(default)]
    items: Vec<ArtistItem>,
}

#[derive(Debug, Deserialize)]
struct ArtistItem {
    name: String,
    followers: Option<Followers>,
    popularity: Option<u32>,
    external_urls: Option<ExternalUrls>,
    #[serde(default)]
    images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
struct Followers {
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Image {
    url: String,
}

impl From<ArtistItem> for SpotifyArtist {
    fn from(item: ArtistItem) -> Self {
        Self {
            name: item.name,
            followers: item.followers.and_then(|f| f.total).unwrap_or(0),
            popularity: item.popularity.unwrap_or(0),
            url: item.external_urls.and_then(|u| u.spotify),
            image: item.images.into_iter().next().map(|i| i.url),
        }
    }
}

/// Spotify Web API client
pub struct SpotifyClient {
    http_client: reqwest::Client,
    credentials: SpotifyCredentials,
    accounts_url: String,
    api_url: String,
    clock: SharedClock,
    token: Mutex<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(credentials: SpotifyCredentials, clock: SharedClock) -> Result<Self, SpotifyError> {
        Self::with_endpoints(credentials, clock, SPOTIFY_ACCOUNTS_URL, SPOTIFY_API_URL)
    }

    /// Client against alternative auth/API endpoints (tests)
    pub fn with_endpoints(
        credentials: SpotifyCredentials,
        clock: SharedClock,
        accounts_url: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Result<Self, SpotifyError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| SpotifyError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            credentials,
            accounts_url: accounts_url.into().trim_end_matches('/').to_string(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            clock,
            token: Mutex::new(None),
        })
    }

    /// Valid access token, refreshing the cache if expired
    pub async fn access_token(&self) -> Result<String, SpotifyError> {
        let mut cached = self.token.lock().await;
        let now = self.clock.now();

        if let Some(token) = cached.as_ref() {
            if now < token.expires_at {
                return Ok(token.access_token.clone());
            }
            tracing::debug!(expired_at = %token.expires_at, "Spotify token expired, refreshing");
        }

        let fresh = self.request_token(now).await?;
        let access_token = fresh.access_token.clone();
        *cached = Some(fresh);
        Ok(access_token)
    }

    async fn request_token(&self, now: DateTime<Utc>) -> Result<CachedToken, SpotifyError> {
        let url = format!("{}/api/token", self.accounts_url);

        let response = self
            .http_client
            .post(&url)
            .header(reqwest::header::AUTHORIZATION, self.credentials.basic_auth_header())
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| SpotifyError::Auth(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpotifyError::Auth(format!(
                "token endpoint returned {}",
                status.as_u16()
            )));
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| SpotifyError::Auth(format!("unreadable token response: {}", e)))?;

        let lifetime = body.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);
        tracing::info!(expires_in = lifetime, "Obtained Spotify access token");

        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: now + ChronoDuration::seconds(lifetime),
        })
    }

    /// Search for an artist by name, returning the top match
    pub async fn search_artist(&self, name: &str) -> Result<Option<SpotifyArtist>, SpotifyError> {
        let token = self.access_token().await?;
        let url = format!("{}/v1/search", self.api_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(token)
            .query(&[("q", name), ("type", "artist"), ("limit", "1")])
            .send()
            .await
            .map_err(|e| SpotifyError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(SpotifyError::Auth("search rejected the access token".to_string()));
        }
        if !status.is_success() {
            return Err(SpotifyError::ApiError(status.as_u16()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SpotifyError::ParseError(e.to_string()))?;

        Ok(body
            .artists
            .and_then(|page| page.items.into_iter().next())
            .map(SpotifyArtist::from))
    }
}

#[async_trait]
impl PopularitySource for SpotifyClient {
    async fn lookup_artist(&self, name: &str) -> Result<Option<SpotifyArtist>, SpotifyError> {
        self.search_artist(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_auth_header() {
        let credentials = SpotifyCredentials::new("id", "secret");
        // base64("id:secret")
        assert_eq!(credentials.basic_auth_header(), "Basic aWQ6c2VjcmV0");
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let credentials = SpotifyCredentials::new("id", "hunter2");
        let debug = format!("{:?}", credentials);
        assert!(debug.contains("id"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_artist_item_conversion() {
        let item: ArtistItem = serde_json::from_value(serde_json::json!({
            "name": "Opeth",
            "followers": {"total": 1500000},
            "popularity": 61,
            "external_urls": {"spotify": "https://open.spotify.com/artist/x"},
            "images": [{"url": "https://i.scdn.co/a.jpg"}, {"url": "https://i.scdn.co/b.jpg"}]
        }))
        .unwrap();

        let artist = SpotifyArtist::from(item);
        assert_eq!(artist.followers, 1_500_000);
        assert_eq!(artist.popularity, 61);
        assert_eq!(artist.image.as_deref(), Some("https://i.scdn.co/a.jpg"));
    }

    #[test]
    fn test_artist_item_without_images() {
        let item: ArtistItem = serde_json::from_value(serde_json::json!({
            "name": "Obscure",
            "followers": {"total": 12},
            "popularity": 3
        }))
        .unwrap();

        let artist = SpotifyArtist::from(item);
        assert!(artist.image.is_none());
        assert!(artist.url.is_none());
    }

    #[test]
    fn test_auth_error_classification() {
        assert!(SpotifyError::Auth("x".into()).is_auth());
        assert!(!SpotifyError::ApiError(500).is_auth());
    }
}
