//! Asset metadata property bag and commit target resolution

use super::UploadError;
use serde::{Deserialize, Serialize};

/// Key of the existing-asset identifier
pub const MEDIA_ID_KEY: &str = "mediaId";

/// Key of the brand/collection identifier
pub const BRAND_ID_KEY: &str = "brandId";

/// Caller supplied asset metadata
///
/// Every entry except `mediaId` is passed through verbatim as a form field
/// of the commit request, in insertion order. A key may repeat (multi-valued
/// tags, metaproperties); [`AssetMetadata::insert`] replaces every value of a
/// key while [`AssetMetadata::append`] adds one more.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetMetadata(Vec<(String, String)>);

impl AssetMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metadata for a brand new asset
    pub fn for_new_asset(brand_id: impl Into<String>) -> Self {
        let mut metadata = Self::new();
        metadata.insert(BRAND_ID_KEY, brand_id);
        metadata
    }

    /// Metadata for a new version of an existing asset
    pub fn for_new_version(media_id: impl Into<String>) -> Self {
        let mut metadata = Self::new();
        metadata.insert(MEDIA_ID_KEY, media_id);
        metadata
    }

    /// Set the single value of `key`, returning the first value it replaced
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        let previous = self.remove(&key);
        self.0.push((key, value.into()));
        previous
    }

    /// Add a value for `key`, keeping the ones already present
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// First value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Every value of `key`, in insertion order
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Remove every value of `key`, returning the first one
    pub fn remove(&mut self, key: &str) -> Option<String> {
        let position = self.0.iter().position(|(k, _)| k == key)?;
        let (_, value) = self.0.remove(position);
        self.0.retain(|(k, _)| k != key);
        Some(value)
    }

    /// Existing-asset identifier, if present and not blank
    pub fn media_id(&self) -> Option<&str> {
        self.get(MEDIA_ID_KEY).filter(|id| !id.trim().is_empty())
    }

    /// Brand identifier, if present and not blank
    pub fn brand_id(&self) -> Option<&str> {
        self.get(BRAND_ID_KEY).filter(|id| !id.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve where the upload gets committed
    ///
    /// Removes `mediaId` from the bag: it addresses the commit URL and is
    /// never part of the body. Without a media id a non-blank `brandId` is
    /// mandatory.
    pub fn resolve_target(&mut self) -> Result<CommitTarget, UploadError> {
        let media_id = self.remove(MEDIA_ID_KEY).filter(|id| !id.trim().is_empty());

        match media_id {
            Some(media_id) => Ok(CommitTarget::NewVersion { media_id }),
            None if self.brand_id().is_some() => Ok(CommitTarget::NewAsset),
            None => Err(UploadError::Validation(
                "Brand id is required when no media id is given".into(),
            )),
        }
    }

    /// Form fields of the commit request
    pub fn into_form(self) -> Vec<(String, String)> {
        self.0
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AssetMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Where a finalized upload is committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitTarget {
    /// Save as a new asset in the brand from the metadata
    NewAsset,
    /// Save as a new version of an existing asset
    NewVersion { media_id: String },
}

impl CommitTarget {
    /// Metric label
    pub fn kind(&self) -> &'static str {
        match self {
            CommitTarget::NewAsset => "new_asset",
            CommitTarget::NewVersion { .. } => "new_version",
        }
    }
}
