//! Content library: uploaded files with searchable metadata

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use log::warn;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::compensate;
use super::impl_fields;
use super::logged;
use crate::BizdeskClient;
use crate::api::CONTENT_LIBRARY_BUCKET;
use crate::api::TableRecord;
use crate::api::UploadOptions;
use crate::api::content_type_for;
use crate::api::object_path;
use crate::api::query::Filter;
use crate::api::query::OrderBy;
use crate::api::query::Query;
use crate::error::Error;
use crate::error::ValidationErrors;
use crate::validation;

/// Largest accepted upload (50 MiB).
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// A `content_library` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub uploaded_by: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TableRecord for ContentItem {
    const TABLE: &'static str = "content_library";

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl_fields!(ContentItem {
    id,
    title,
    description,
    category,
    tags,
    file_name,
    file_type,
    file_size,
    created_at,
});

/// A file to add to the library.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewContent {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub uploaded_by: Option<Uuid>,
}

impl NewContent {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::require_text(&mut errors, "title", Some(self.title.as_str()));
        if validation::require_text(&mut errors, "file_name", Some(self.file_name.as_str())) {
            if self.bytes.is_empty() {
                errors.push("file", "File is empty");
            } else if self.bytes.len() > MAX_UPLOAD_BYTES {
                errors.push("file", format!("File is larger than {} MiB", MAX_UPLOAD_BYTES / (1024 * 1024)));
            }
        }
        errors.into_result()
    }

    /// Tags trimmed, lowercased and deduplicated, in first-seen order.
    pub fn normalized_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = Vec::new();
        for tag in &self.tags {
            let tag = tag.trim().to_lowercase();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }
        tags
    }
}

#[derive(Serialize)]
struct ContentRow<'a> {
    title: &'a str,
    description: Option<&'a str>,
    category: Option<&'a str>,
    tags: Vec<String>,
    file_name: &'a str,
    file_path: &'a str,
    file_url: &'a str,
    file_type: &'a str,
    file_size: i64,
    uploaded_by: Option<Uuid>,
}

/// Aggregates returned by `get_content_library_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ContentStats {
    #[serde(default)]
    pub total_items: i64,
    #[serde(default)]
    pub total_size: i64,
    #[serde(default)]
    pub by_category: BTreeMap<String, i64>,
    #[serde(default)]
    pub by_type: BTreeMap<String, i64>,
}

impl ContentStats {
    /// Table-returning functions answer with an array of rows; scalar ones
    /// with a bare object. An empty array means no content.
    fn from_rpc(value: serde_json::Value) -> Result<Self, Error> {
        let value = match value {
            serde_json::Value::Array(rows) => match rows.into_iter().next() {
                Some(first) => first,
                None => return Ok(Self::default()),
            },
            serde_json::Value::Null => return Ok(Self::default()),
            other => other,
        };
        Ok(serde_json::from_value(value)?)
    }
}

pub struct ContentLibrary<'a> {
    client: &'a BizdeskClient,
}

impl<'a> ContentLibrary<'a> {
    pub(crate) fn new(client: &'a BizdeskClient) -> Self {
        Self { client }
    }

    /// Newest first.
    pub async fn list(&self) -> Result<Vec<ContentItem>, Error> {
        let query = Query::new().order(OrderBy::desc("created_at"));
        logged("list content", self.client.list::<ContentItem>(&query).await)
    }

    pub async fn list_category(&self, category: &str) -> Result<Vec<ContentItem>, Error> {
        let query = Query::new()
            .filter(Filter::eq("category", category))
            .order(OrderBy::desc("created_at"));
        logged("list content", self.client.list::<ContentItem>(&query).await)
    }

    /// Uploads the file, then records it.
    ///
    /// Cancelling `cancel` aborts the upload. If the row cannot be inserted
    /// the uploaded object is removed again.
    pub async fn upload(&self, new: &NewContent, cancel: Option<&CancellationToken>) -> Result<ContentItem, Error> {
        new.validate()?;

        let folder = validation::non_blank(new.category.as_deref())
            .map(|c| c.to_lowercase().replace(char::is_whitespace, "-"))
            .unwrap_or_else(|| "general".to_string());
        let path = object_path(&folder, &new.file_name);
        let file_type = content_type_for(&new.file_name);

        let stored = logged(
            "upload content",
            self.client
                .upload(
                    CONTENT_LIBRARY_BUCKET,
                    &path,
                    new.bytes.clone(),
                    &UploadOptions::for_file(&new.file_name),
                    cancel,
                )
                .await,
        )?;

        let row = ContentRow {
            title: new.title.trim(),
            description: validation::non_blank(new.description.as_deref()),
            category: validation::non_blank(new.category.as_deref()),
            tags: new.normalized_tags(),
            file_name: &new.file_name,
            file_path: &stored.path,
            file_url: &stored.public_url,
            file_type,
            file_size: new.bytes.len() as i64,
            uploaded_by: new.uploaded_by,
        };

        match self.client.insert::<ContentItem, _>(&row).await {
            Ok(item) => Ok(item),
            Err(e) => {
                let paths = [stored.path.clone()];
                Err(compensate("record content", e, || self.client.remove(CONTENT_LIBRARY_BUCKET, &paths)).await)
            }
        }
    }

    /// Deletes the row, then its object. A failure to remove the object is
    /// logged only.
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        let item = logged("get content", self.client.get_by_id::<ContentItem>(id).await)?;
        logged("delete content", self.client.delete::<ContentItem>(id).await)?;
        if let Err(e) = self
            .client
            .remove(CONTENT_LIBRARY_BUCKET, &[item.file_path.clone()])
            .await
        {
            warn!("removing object {} failed: {}", item.file_path, e);
        }
        Ok(())
    }

    /// Downloads a library file's bytes.
    pub async fn download(&self, item: &ContentItem) -> Result<Vec<u8>, Error> {
        logged(
            "download content",
            self.client.download(CONTENT_LIBRARY_BUCKET, &item.file_path).await,
        )
    }

    pub async fn stats(&self) -> Result<ContentStats, Error> {
        let value: serde_json::Value = logged(
            "content stats",
            self.client.rpc("get_content_library_stats", &json!({})).await,
        )?;
        ContentStats::from_rpc(value)
    }

    /// Full-text search. A blank term lists everything.
    pub async fn search(&self, term: &str) -> Result<Vec<ContentItem>, Error> {
        let Some(term) = validation::non_blank(Some(term)) else {
            return self.list().await;
        };
        logged(
            "search content",
            self.client
                .rpc("search_content_library", &json!({ "search_term": term }))
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::codes;

    fn file(bytes: usize) -> NewContent {
        NewContent {
            title: "Brand guide".into(),
            file_name: "guide.pdf".into(),
            bytes: vec![0; bytes],
            ..NewContent::default()
        }
    }

    #[test]
    fn test_validate_upload() {
        assert!(file(10).validate().is_ok());

        let err = file(0).validate().unwrap_err();
        assert_eq!(err.for_field("file"), Some("File is empty"));

        let err = file(MAX_UPLOAD_BYTES + 1).validate().unwrap_err();
        assert!(err.for_field("file").is_some());

        let err = NewContent::default().validate().unwrap_err();
        assert!(err.has_code("title", codes::REQUIRED));
        assert!(err.has_code("file_name", codes::REQUIRED));
        assert!(err.for_field("file").is_none());
    }

    #[test]
    fn test_normalized_tags() {
        let content = NewContent {
            tags: vec![" Brand ".into(), "brand".into(), "".into(), "Logo".into()],
            ..NewContent::default()
        };
        assert_eq!(content.normalized_tags(), vec!["brand", "logo"]);
    }

    #[test]
    fn test_stats_from_rpc_shapes() {
        let row = json!({ "total_items": 3, "total_size": 2048, "by_category": { "marketing": 2 } });

        let stats = ContentStats::from_rpc(json!([row.clone()])).unwrap();
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.by_category.get("marketing"), Some(&2));

        assert_eq!(ContentStats::from_rpc(row).unwrap().total_size, 2048);
        assert_eq!(ContentStats::from_rpc(json!([])).unwrap(), ContentStats::default());
    }
}
