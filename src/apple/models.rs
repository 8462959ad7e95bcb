use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// A song that can be looked up in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    catalog_id: String,
    title: String,
    artist_name: String,
}

impl Track {
    pub fn new(
        catalog_id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let catalog_id = catalog_id.into();
        if catalog_id.trim().is_empty() {
            return Err(ValidationError::MissingField("catalogId"));
        }
        Ok(Self {
            catalog_id,
            title: title.into(),
            artist_name: artist_name.into(),
        })
    }

    /// Build a track from a catalog or library song resource.
    ///
    /// Library resources point at the catalog through `playParams.catalogId`;
    /// resources without a resolvable catalog id yield `None`.
    pub fn from_resource(res: &Resource<SongAttributes>) -> Option<Self> {
        let attrs = res.attributes.as_ref()?;
        let catalog_id = match &attrs.play_params {
            Some(pp) => pp
                .catalog_id
                .clone()
                .filter(|id| !id.is_empty())
                .or_else(|| (res.kind.as_deref() == Some("songs")).then(|| res.id.clone())),
            None => Some(res.id.clone()),
        }?;
        Self::new(catalog_id, attrs.name.clone(), attrs.artist_name.clone()).ok()
    }

    pub fn catalog_id(&self) -> &str {
        &self.catalog_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn artist_name(&self) -> &str {
        &self.artist_name
    }
}

/// `{ "data": [...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct DataPage<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<Resource<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource<T> {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub attributes: Option<T>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist_name: String,
    pub play_params: Option<PlayParams>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayParams {
    pub catalog_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedAttributes {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtistAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub genre_names: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LyricsAttributes {
    pub ttml: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: SearchResults,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResults {
    pub songs: Option<DataPage<SongAttributes>>,
    pub artists: Option<DataPage<ArtistAttributes>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartsResponse {
    pub results: ChartsResults,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartsResults {
    #[serde(default)]
    pub songs: Vec<DataPage<SongAttributes>>,
}
