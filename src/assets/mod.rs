//! Image and file payloads: either uploaded for a reference or inlined as data URLs.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::envelope::record_payload;
use crate::api::ApiClient;
use crate::collection::Draft;
use crate::error::{ClientError, ClientResult};

pub const DEFAULT_MIME: &str = "image/jpeg";

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub bytes: Vec<u8>,
    /// Type declared by whoever picked the file, possibly empty
    pub declared_mime: Option<String>,
    pub file_name: Option<String>,
}

impl Asset {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, declared_mime: None, file_name: None }
    }

    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self {
            bytes,
            declared_mime: mime_from_extension(path),
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        })
    }

    pub fn with_mime(mut self, mime: &str) -> Self {
        self.declared_mime = Some(mime.to_string());
        self
    }

    /// Declared type when it looks like one, else sniffed from the content
    pub fn mime(&self) -> String {
        match self.declared_mime.as_deref().map(str::trim) {
            Some(m) if m.contains('/') => m.to_string(),
            _ => sniff_mime(&STANDARD.encode(&self.bytes)).to_string(),
        }
    }
}

fn mime_from_extension(path: &std::path::Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime.to_string())
}

/// Guesses an image type from the first characters of its base64 encoding
pub fn sniff_mime(base64: &str) -> &'static str {
    let b = base64.trim_start();
    if b.starts_with("iVBOR") {
        "image/png"
    } else if b.starts_with("/9j/") {
        "image/jpeg"
    } else if b.starts_with("R0lG") {
        "image/gif"
    } else if b.starts_with("UklGR") {
        "image/webp"
    } else {
        DEFAULT_MIME
    }
}

pub fn encode_data_url(asset: &Asset) -> String {
    format!("data:{};base64,{}", asset.mime(), STANDARD.encode(&asset.bytes))
}

/// Splits `data:<mime>;base64,<payload>` back into its type and bytes
pub fn parse_data_url(url: &str) -> Option<(String, Vec<u8>)> {
    let rest = url.trim().strip_prefix("data:")?;
    let (meta, payload) = rest.split_once(',')?;
    let mime = meta.strip_suffix(";base64")?;
    let bytes = STANDARD.decode(payload.trim()).ok()?;
    let mime = if mime.is_empty() { sniff_mime(payload).to_string() } else { mime.to_string() };
    Some((mime, bytes))
}

/// What ends up in the JSON body in place of the file
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AssetRef {
    Inline(String),
    Uploaded(String),
}

impl AssetRef {
    pub fn as_value(&self) -> Value {
        match self {
            AssetRef::Inline(s) | AssetRef::Uploaded(s) => Value::String(s.clone()),
        }
    }
}

#[async_trait]
pub trait AssetResolver: Send + Sync {
    async fn resolve(&self, asset: &Asset) -> ClientResult<AssetRef>;
}

/// Fallback for resources without an upload endpoint
pub struct InlineResolver;

#[async_trait]
impl AssetResolver for InlineResolver {
    async fn resolve(&self, asset: &Asset) -> ClientResult<AssetRef> {
        if asset.bytes.is_empty() {
            return Err(ClientError::validation("file is empty"));
        }
        Ok(AssetRef::Inline(encode_data_url(asset)))
    }
}

/// Posts the raw bytes and keeps the reference the server hands back
pub struct UploadResolver {
    client: ApiClient,
    path: String,
}

impl UploadResolver {
    pub fn new(client: ApiClient, path: &str) -> Self {
        Self { client, path: path.to_string() }
    }
}

#[async_trait]
impl AssetResolver for UploadResolver {
    async fn resolve(&self, asset: &Asset) -> ClientResult<AssetRef> {
        if asset.bytes.is_empty() {
            return Err(ClientError::validation("file is empty"));
        }
        let response = self
            .client
            .send_bytes(&self.path, asset.bytes.clone(), &asset.mime())
            .await?
            .into_result()?;

        let record = record_payload(response.body.as_ref())
            .ok_or_else(|| ClientError::Decode("upload response carried no record".into()))?;
        ["id", "url", "path"]
            .iter()
            .find_map(|k| match record.get(*k) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .map(AssetRef::Uploaded)
            .ok_or_else(|| ClientError::Decode("upload response carried no reference".into()))
    }
}

/// Per-resource choice between uploading and inlining
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum AssetStrategy {
    #[default]
    Inline,
    Upload { path: String },
}

impl AssetStrategy {
    pub fn resolver(&self, client: &ApiClient) -> Box<dyn AssetResolver> {
        match self {
            AssetStrategy::Inline => Box::new(InlineResolver),
            AssetStrategy::Upload { path } => Box::new(UploadResolver::new(client.clone(), path)),
        }
    }
}

/// Resolves `asset` and stores the reference in `field` of the draft
pub async fn attach(draft: &mut Draft, field: &str, asset: &Asset, resolver: &dyn AssetResolver) -> ClientResult<()> {
    let reference = resolver.resolve(asset).await?;
    draft.set(field, reference.as_value());
    Ok(())
}
