use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Media type assumed when a provider omits one on an inline image.
pub const DEFAULT_IMAGE_MEDIA_TYPE: &str = "image/png";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataUriError {
    #[error("missing data: scheme")]
    MissingScheme,
    #[error("only base64 data uris are supported")]
    NotBase64,
    #[error("missing media type")]
    MissingMediaType,
    #[error("invalid base64 body: {0}")]
    InvalidBody(String),
}

/// A self-describing inline image: `data:<media type>;base64,<body>`.
///
/// The body is kept base64-encoded because that is the form the provider
/// accepts and returns; decoding only happens when pixels are needed.
#[derive(Clone, PartialEq, Eq)]
pub struct DataUri {
    media_type: String,
    data: String,
}

impl DataUri {
    pub fn new(media_type: impl Into<String>, base64_data: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            data: base64_data.into(),
        }
    }

    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self::new(media_type, B64.encode(bytes))
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Base64 body without the `data:` prefix.
    pub fn base64_data(&self) -> &str {
        &self.data
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DataUriError> {
        B64.decode(self.data.as_bytes())
            .map_err(|e| DataUriError::InvalidBody(e.to_string()))
    }

    /// Encoded length of the body, used for payload-size logging.
    pub fn encoded_len(&self) -> usize {
        self.data.len()
    }
}

impl FromStr for DataUri {
    type Err = DataUriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.trim().strip_prefix("data:").ok_or(DataUriError::MissingScheme)?;
        let (header, body) = rest.split_once(',').ok_or(DataUriError::NotBase64)?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or(DataUriError::NotBase64)?;
        if media_type.is_empty() {
            return Err(DataUriError::MissingMediaType);
        }
        if body.is_empty() {
            return Err(DataUriError::InvalidBody("empty body".into()));
        }
        Ok(Self::new(media_type, body))
    }
}

impl fmt::Display for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.media_type, self.data)
    }
}

// Bodies can be megabytes long; keep Debug output readable in logs.
impl fmt::Debug for DataUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataUri")
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}

impl Serialize for DataUri {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataUri {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
