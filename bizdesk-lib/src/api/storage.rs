//! Object storage
//!
//! Upload, download, public URLs and removal for objects in named buckets.
//! Uploads can be aborted through a [`CancellationToken`].

use chrono::Utc;
use rand::Rng;
use reqwest::Method;
use reqwest::header::HeaderValue;
use serde::Deserialize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::execute::read_json;
use super::execute::to_body;
use crate::BizdeskClient;
use crate::error::ApiError;
use crate::error::Error;

/// Bucket holding product photos.
pub const PRODUCT_IMAGES_BUCKET: &str = "product-images";

/// Bucket holding content-library files.
pub const CONTENT_LIBRARY_BUCKET: &str = "content-library";

const RANDOM_SUFFIX_LEN: usize = 8;

/// Options for an upload.
#[derive(Debug, Clone)]
pub struct UploadOptions {
    pub content_type: String,
    pub cache_control_secs: u32,
    pub upsert: bool,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            content_type: "application/octet-stream".to_string(),
            cache_control_secs: 3600,
            upsert: false,
        }
    }
}

impl UploadOptions {
    /// Options with the content type guessed from a file name.
    pub fn for_file(file_name: &str) -> Self {
        Self {
            content_type: content_type_for(file_name).to_string(),
            ..Self::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }
}

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    /// Path inside the bucket.
    pub path: String,
    pub public_url: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

#[derive(Serialize)]
struct RemoveRequest<'a> {
    prefixes: &'a [String],
}

/// Builds a collision-resistant object path: `{folder}/{unix_millis}-{random}.{ext}`.
///
/// The extension is taken from `file_name`; names without one get no suffix.
pub fn object_path(folder: &str, file_name: &str) -> String {
    let millis = Utc::now().timestamp_millis();
    let random = random_suffix();

    let stem = format!("{millis}-{random}");
    let name = match extension(file_name) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    };

    let folder = folder.trim_matches('/');
    if folder.is_empty() {
        name
    } else {
        format!("{folder}/{name}")
    }
}

fn random_suffix() -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::rng();
    (0..RANDOM_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

fn extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Guesses a MIME type from a file extension.
pub fn content_type_for(file_name: &str) -> &'static str {
    match extension(file_name).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("mp4") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("mp3") => "audio/mpeg",
        Some("csv") => "text/csv",
        Some("txt") => "text/plain",
        Some("json") => "application/json",
        Some("doc") => "application/msword",
        Some("docx") => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

impl BizdeskClient {
    /// Public URL of an object in a public bucket. No request is made.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        self.storage_url(&format!("object/public/{}/{}", bucket, encode_path(path)))
    }

    /// Uploads bytes to `bucket/path`.
    ///
    /// If `cancel` fires before the upload finishes the request is dropped and
    /// [`Error::Cancelled`] is returned.
    pub async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        options: &UploadOptions,
        cancel: Option<&CancellationToken>,
    ) -> Result<StoredObject, Error> {
        let url = self.storage_url(&format!("object/{}/{}", bucket, encode_path(path)));

        let mut headers = self.default_headers();
        let content_type = HeaderValue::from_str(&options.content_type)
            .map_err(|_| Error::InvalidOperation(format!("invalid content type {}", options.content_type)))?;
        headers.insert("Content-Type", content_type);
        headers.insert(
            "x-upsert",
            HeaderValue::from_static(if options.upsert { "true" } else { "false" }),
        );
        if let Ok(value) = HeaderValue::from_str(&format!("max-age={}", options.cache_control_secs)) {
            headers.insert("Cache-Control", value);
        }

        let send = self.request(Method::POST, &url, Some(headers), Some(bytes));
        let response = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return Err(Error::Cancelled),
                response = send => response?,
            },
            None => send.await?,
        };

        let uploaded: UploadResponse = read_json(response).await?;
        let path = uploaded
            .key
            .and_then(|key| key.strip_prefix(&format!("{bucket}/")).map(str::to_string))
            .unwrap_or_else(|| path.to_string());

        Ok(StoredObject {
            bucket: bucket.to_string(),
            public_url: self.public_url(bucket, &path),
            path,
        })
    }

    /// Downloads an object's bytes.
    pub async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>, Error> {
        let url = self.storage_url(&format!("object/{}/{}", bucket, encode_path(path)));
        let response = self.request(Method::GET, &url, None, None).await?;
        let bytes = response.bytes().await.map_err(ApiError::from)?;
        Ok(bytes.to_vec())
    }

    /// Removes objects from a bucket. Missing paths are not an error.
    pub async fn remove(&self, bucket: &str, paths: &[String]) -> Result<(), Error> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.storage_url(&format!("object/{bucket}"));
        let body = to_body(&RemoveRequest { prefixes: paths })?;
        self.request(Method::DELETE, &url, None, Some(body)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_shape() {
        let path = object_path("products/", "Photo.JPG");
        let (folder, name) = path.split_once('/').unwrap();
        assert_eq!(folder, "products");
        let (stem, ext) = name.rsplit_once('.').unwrap();
        assert_eq!(ext, "jpg");
        let (millis, random) = stem.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(random.len(), RANDOM_SUFFIX_LEN);
    }

    #[test]
    fn test_object_path_without_extension_or_folder() {
        let path = object_path("", "README");
        assert!(!path.contains('/'));
        assert!(!path.contains('.'));
    }

    #[test]
    fn test_object_paths_differ() {
        assert_ne!(object_path("a", "x.png"), object_path("a", "x.png"));
    }

    #[test]
    fn test_content_type_for() {
        assert_eq!(content_type_for("a.PNG"), "image/png");
        assert_eq!(content_type_for("report.pdf"), "application/pdf");
        assert_eq!(content_type_for(".bashrc"), "application/octet-stream");
        assert_eq!(content_type_for("noext"), "application/octet-stream");
    }

    #[test]
    fn test_public_url() {
        let client = BizdeskClient::builder()
            .url("https://proj.example.co/")
            .api_key("anon")
            .build()
            .unwrap();
        assert_eq!(
            client.public_url(PRODUCT_IMAGES_BUCKET, "products/1 2.png"),
            "https://proj.example.co/storage/v1/object/public/product-images/products/1%202.png"
        );
    }
}
