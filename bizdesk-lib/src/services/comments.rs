//! Task comments with live updates

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use super::impl_fields;
use super::logged;
use crate::BizdeskClient;
use crate::api::LiveCollection;
use crate::api::Subscription;
use crate::api::TableRecord;
use crate::api::query::Filter;
use crate::api::query::OrderBy;
use crate::api::query::Query;
use crate::error::Error;
use crate::error::ValidationErrors;
use crate::validation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskComment {
    pub id: Uuid,
    pub task_id: Uuid,
    #[serde(default)]
    pub author_id: Option<Uuid>,
    #[serde(default)]
    pub author_name: Option<String>,
    pub content: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskComment {
    pub fn is_edited(&self) -> bool {
        matches!((self.created_at, self.updated_at), (Some(c), Some(u)) if u > c)
    }
}

impl TableRecord for TaskComment {
    const TABLE: &'static str = "task_comments";

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl_fields!(TaskComment {
    id,
    task_id,
    author_name,
    content,
    created_at,
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    pub task_id: Uuid,
    pub author_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub content: String,
}

#[derive(Serialize)]
struct ContentPatch<'a> {
    content: &'a str,
}

fn check_content(content: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    validation::require_text(&mut errors, "content", Some(content));
    errors.into_result()
}

/// Oldest first, undated comments last.
fn chronological(a: &TaskComment, b: &TaskComment) -> std::cmp::Ordering {
    match (a.created_at, b.created_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    }
}

pub struct TaskComments<'a> {
    client: &'a BizdeskClient,
}

impl<'a> TaskComments<'a> {
    pub(crate) fn new(client: &'a BizdeskClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, task_id: Uuid) -> Result<Vec<TaskComment>, Error> {
        let query = Query::new()
            .filter(Filter::eq("task_id", task_id))
            .order(OrderBy::asc("created_at"));
        logged("list comments", self.client.list::<TaskComment>(&query).await)
    }

    pub async fn create(&self, new: &NewComment) -> Result<TaskComment, Error> {
        check_content(&new.content)?;
        let row = NewComment {
            content: new.content.trim().to_string(),
            ..new.clone()
        };
        logged("create comment", self.client.insert::<TaskComment, _>(&row).await)
    }

    pub async fn update(&self, id: Uuid, content: &str) -> Result<TaskComment, Error> {
        check_content(content)?;
        let patch = ContentPatch {
            content: content.trim(),
        };
        logged("update comment", self.client.update::<TaskComment, _>(id, &patch).await)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        logged("delete comment", self.client.delete::<TaskComment>(id).await)
    }

    /// Loads a task's comments into a collection that realtime changes on
    /// `task_comments` for the same task can be applied to.
    ///
    /// ```ignore
    /// let mut live = client.comments().live(task_id).await?;
    /// live.follow(events, |comments| render(comments)).await;
    /// ```
    pub async fn live(&self, task_id: Uuid) -> Result<LiveCollection<TaskComment>, Error> {
        let items = self.list(task_id).await?;
        Ok(Self::collection(task_id, items))
    }

    fn collection(task_id: Uuid, items: Vec<TaskComment>) -> LiveCollection<TaskComment> {
        let subscription = Subscription::table(TaskComment::TABLE).where_eq("task_id", task_id);
        LiveCollection::new(subscription, items).with_order(chronological)
    }
}
