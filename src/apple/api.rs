use crate::apple::auth::AuthState;
use crate::apple::models::{
    ArtistAttributes, ChartsResponse, DataPage, LyricsAttributes, NamedAttributes, Resource,
    SearchResponse, SongAttributes, Track,
};
use crate::batch::LyricsSource;
use crate::lyrics::Tier;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, ORIGIN, USER_AGENT};
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

const API_BASE: &str = "https://amp-api.music.apple.com/v1";
const PAGE_SIZE: usize = 100;

#[derive(Debug)]
struct Inner {
    http: reqwest::Client,
    storefront: String,
}

#[derive(Debug, Clone)]
pub struct AppleMusicClient {
    inner: Arc<Inner>,
}

/// Artist picked from a search, as shown in the selection list.
#[derive(Debug, Clone)]
pub struct ArtistSummary {
    pub id: String,
    pub name: String,
    pub genre: Option<String>,
}

/// Library playlist.
#[derive(Debug, Clone)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
}

impl AppleMusicClient {
    /// Plain client used to bootstrap tokens.
    pub fn bootstrap_http() -> anyhow::Result<reqwest::Client> {
        reqwest::Client::builder()
            .default_headers(base_headers())
            .build()
            .context("build reqwest client")
    }

    pub fn new(auth: &AuthState, storefront: &str) -> anyhow::Result<Self> {
        let mut headers = base_headers();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", auth.developer_token))
                .context("developer token header")?,
        );
        headers.insert(
            HeaderName::from_static("media-user-token"),
            HeaderValue::from_str(&auth.media_user_token).context("media-user-token header")?,
        );

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("build reqwest client")?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                storefront: storefront.to_string(),
            }),
        })
    }

    fn catalog_url(&self, path: &str) -> String {
        format!("{API_BASE}/catalog/{}/{path}", self.inner.storefront)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> anyhow::Result<T> {
        self.inner
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("send {what} request"))?
            .error_for_status()
            .with_context(|| format!("{what} http status"))?
            .json()
            .await
            .with_context(|| format!("parse {what} json"))
    }

    /// Walk an offset-paginated collection. A failing page ends the walk and
    /// keeps what was collected so far.
    async fn paginate<T: DeserializeOwned>(&self, url: &str, what: &str) -> Vec<Resource<T>> {
        let mut items = Vec::new();
        let mut offset = 0;
        loop {
            let query = [("offset", offset.to_string()), ("limit", PAGE_SIZE.to_string())];
            let page: DataPage<T> = match self.get_json(url, &query, what).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %format!("{e:#}"), offset, "{what} page failed");
                    break;
                }
            };
            let n = page.data.len();
            items.extend(page.data);
            debug!(count = items.len(), "{what} page loaded");
            if n < PAGE_SIZE {
                break;
            }
            offset += PAGE_SIZE;
        }
        items
    }

    pub async fn search_tracks(&self, term: &str, limit: usize) -> anyhow::Result<Vec<Track>> {
        let query = [
            ("term", term.to_string()),
            ("types", "songs".to_string()),
            ("limit", limit.to_string()),
        ];
        let v: SearchResponse = self
            .get_json(&self.catalog_url("search"), &query, "search")
            .await?;
        Ok(tracks_from(v.results.songs.map(|p| p.data).unwrap_or_default()))
    }

    pub async fn search_artists(&self, term: &str, limit: usize) -> anyhow::Result<Vec<ArtistSummary>> {
        let query = [
            ("term", term.to_string()),
            ("types", "artists".to_string()),
            ("limit", limit.to_string()),
        ];
        let v: SearchResponse = self
            .get_json(&self.catalog_url("search"), &query, "artist search")
            .await?;
        let artists = v
            .results
            .artists
            .map(|p| p.data)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|r: Resource<ArtistAttributes>| {
                let a = r.attributes?;
                Some(ArtistSummary {
                    id: r.id,
                    name: a.name,
                    genre: a.genre_names.into_iter().next(),
                })
            })
            .collect();
        Ok(artists)
    }

    /// Every track on every album of an artist, first occurrence of a catalog id wins.
    pub async fn artist_discography(&self, artist_id: &str) -> anyhow::Result<Vec<Track>> {
        let url = self.catalog_url(&format!("artists/{}/albums", urlencoding::encode(artist_id)));
        let albums: Vec<Resource<NamedAttributes>> = self.paginate(&url, "artist albums").await;
        if albums.is_empty() {
            anyhow::bail!("no albums found for artist {artist_id}");
        }

        let mut seen = HashSet::new();
        let mut tracks = Vec::new();
        for album in &albums {
            for t in self.album_tracks(&album.id).await {
                if seen.insert(t.catalog_id().to_string()) {
                    tracks.push(t);
                }
            }
        }
        Ok(tracks)
    }

    async fn album_tracks(&self, album_id: &str) -> Vec<Track> {
        let url = self.catalog_url(&format!("albums/{}/tracks", urlencoding::encode(album_id)));
        match self.get_json::<DataPage<SongAttributes>>(&url, &[], "album tracks").await {
            Ok(page) => tracks_from(page.data),
            Err(e) => {
                warn!(album_id, error = %format!("{e:#}"), "album tracks failed");
                Vec::new()
            }
        }
    }

    pub async fn charts(&self, limit: usize) -> anyhow::Result<Vec<Track>> {
        let query = [("types", "songs".to_string()), ("limit", limit.to_string())];
        let v: ChartsResponse = self
            .get_json(&self.catalog_url("charts"), &query, "charts")
            .await?;
        let first = v.results.songs.into_iter().next().map(|p| p.data);
        Ok(tracks_from(first.unwrap_or_default()))
    }

    pub async fn library_songs(&self) -> Vec<Track> {
        let url = format!("{API_BASE}/me/library/songs");
        tracks_from(self.paginate(&url, "library songs").await)
    }

    pub async fn library_playlists(&self) -> Vec<PlaylistSummary> {
        let url = format!("{API_BASE}/me/library/playlists");
        self.paginate::<NamedAttributes>(&url, "library playlists")
            .await
            .into_iter()
            .map(|r| PlaylistSummary {
                name: r.attributes.map(|a| a.name).unwrap_or_default(),
                id: r.id,
            })
            .collect()
    }

    pub async fn playlist_tracks(&self, playlist_id: &str) -> Vec<Track> {
        let url = format!(
            "{API_BASE}/me/library/playlists/{}/tracks",
            urlencoding::encode(playlist_id)
        );
        tracks_from(self.paginate(&url, "playlist tracks").await)
    }
}

#[async_trait]
impl LyricsSource for AppleMusicClient {
    async fn fetch_ttml(&self, catalog_id: &str, tier: Tier) -> anyhow::Result<Option<String>> {
        let url = self.catalog_url(&format!(
            "songs/{}/{}",
            urlencoding::encode(catalog_id),
            tier.endpoint()
        ));
        let res = self
            .inner
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("send {tier} lyrics request"))?;
        if !res.status().is_success() {
            debug!(catalog_id, %tier, status = %res.status(), "lyrics unavailable");
            return Ok(None);
        }
        let page: DataPage<LyricsAttributes> = res
            .json()
            .await
            .with_context(|| format!("parse {tier} lyrics json"))?;
        Ok(page
            .data
            .into_iter()
            .next()
            .and_then(|r| r.attributes)
            .and_then(|a| a.ttml))
    }

    async fn search_track(&self, term: &str) -> anyhow::Result<Option<Track>> {
        Ok(self.search_tracks(term, 1).await?.into_iter().next())
    }
}

fn base_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36"),
    );
    headers.insert(ORIGIN, HeaderValue::from_static("https://music.apple.com"));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

fn tracks_from(resources: Vec<Resource<SongAttributes>>) -> Vec<Track> {
    resources.iter().filter_map(Track::from_resource).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_response_to_tracks() {
        let raw = r#"{"results":{"songs":{"href":"/v1/x","data":[
            {"id":"1","type":"songs","attributes":{"name":"A","artistName":"X"}},
            {"id":"2","type":"songs"}
        ]}}}"#;
        let v: SearchResponse = serde_json::from_str(raw).unwrap();
        let tracks = tracks_from(v.results.songs.unwrap().data);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].title(), "A");
    }

    #[test]
    fn test_empty_search_response() {
        let v: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(v.results.songs.is_none());
    }

    #[test]
    fn test_charts_response_takes_first_chart() {
        let raw = r#"{"results":{"songs":[
            {"chart":"most-played","data":[{"id":"9","type":"songs","attributes":{"name":"Hit","artistName":"Star"}}]},
            {"chart":"other","data":[]}
        ]}}"#;
        let v: ChartsResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(v.results.songs.len(), 2);
        assert_eq!(tracks_from(v.results.songs[0].data.clone())[0].catalog_id(), "9");
    }

    #[test]
    fn test_lyrics_response() {
        let raw = r#"{"data":[{"id":"1","type":"syllable-lyrics","attributes":{"ttml":"<tt/>","playParams":{}}}]}"#;
        let page: DataPage<LyricsAttributes> = serde_json::from_str(raw).unwrap();
        assert_eq!(page.data[0].attributes.as_ref().unwrap().ttml.as_deref(), Some("<tt/>"));
    }

    #[test]
    fn test_client_builds_with_tokens() {
        let auth = AuthState {
            developer_token: "dev".into(),
            media_user_token: "user".into(),
        };
        let client = AppleMusicClient::new(&auth, "fr").unwrap();
        assert_eq!(
            client.catalog_url("songs/1/lyrics"),
            "https://amp-api.music.apple.com/v1/catalog/fr/songs/1/lyrics"
        );
    }
}
