use crate::error::{BallotError, Result};
use crate::models::{ImageRef, Item};
use async_trait::async_trait;
use log::{error, info};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Track search. An empty query returns nothing rather than an error.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<Arc<Item>>>;
}

/// Client for the search proxy: `GET {base}/search?q=...` answering
/// `{"tracks": [...]}`.
pub struct HttpCatalog {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpCatalog {
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("music-ballot/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    tracks: Vec<TrackJson>,
}

#[derive(Deserialize)]
struct TrackJson {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<ArtistJson>,
    album: AlbumJson,
}

#[derive(Deserialize)]
struct ArtistJson {
    name: String,
}

#[derive(Deserialize)]
struct AlbumJson {
    name: String,
    #[serde(default)]
    release_date: String,
    #[serde(default)]
    images: Vec<ImageRef>,
}

impl From<TrackJson> for Item {
    fn from(track: TrackJson) -> Self {
        Item {
            id: track.id,
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album: track.album.name,
            release_date: track.album.release_date,
            images: track.album.images,
        }
    }
}

fn parse_search_response(body: &str) -> Result<Vec<Arc<Item>>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|e| BallotError::SearchUnavailable(format!("unexpected response: {}", e)))?;
    Ok(response
        .tracks
        .into_iter()
        .map(|track| Arc::new(Item::from(track)))
        .collect())
}

#[async_trait]
impl Catalog for HttpCatalog {
    async fn search(&self, query: &str) -> Result<Vec<Arc<Item>>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/search", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await?;

        if !response.status().is_success() {
            error!("Search for {:?} failed with status {}", query, response.status());
            return Err(BallotError::SearchUnavailable(format!(
                "search service returned {}",
                response.status()
            )));
        }

        let items = parse_search_response(&response.text().await?)?;
        info!("Search for {:?} returned {} tracks", query, items.len());
        Ok(items)
    }
}

/// Searches a fixed list by case-insensitive substring over track name,
/// artists and album.
pub struct StaticCatalog {
    items: Vec<Arc<Item>>,
}

impl StaticCatalog {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: items.into_iter().map(Arc::new).collect(),
        }
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn search(&self, query: &str) -> Result<Vec<Arc<Item>>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .items
            .iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&needle)
                    || item.album.to_lowercase().contains(&needle)
                    || item.artists.iter().any(|a| a.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }
}
