//! Products, product ideas and product scaling plans

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::Utc;
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::compensate;
use super::impl_fields;
use super::impl_value_from_enum;
use super::logged;
use crate::BizdeskClient;
use crate::api::PRODUCT_IMAGES_BUCKET;
use crate::api::TableRecord;
use crate::api::UploadOptions;
use crate::api::object_path;
use crate::api::query::OrderBy;
use crate::api::query::Query;
use crate::autosave::AutosaveConfig;
use crate::autosave::Autosaver;
use crate::error::Error;
use crate::error::ValidationErrors;
use crate::validation;
use crate::validation::codes;

// =============================================================================
// Statuses
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Discontinued,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Discontinued => "discontinued",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaStatus {
    #[default]
    New,
    Evaluating,
    Approved,
    Rejected,
    Promoted,
}

impl IdeaStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            IdeaStatus::New => "new",
            IdeaStatus::Evaluating => "evaluating",
            IdeaStatus::Approved => "approved",
            IdeaStatus::Rejected => "rejected",
            IdeaStatus::Promoted => "promoted",
        }
    }
}

impl_value_from_enum!(ProductStatus, IdeaStatus);

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub cost: Option<Decimal>,
    #[serde(default)]
    pub status: ProductStatus,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_path: Option<String>,
    #[serde(default)]
    pub target_units: Option<i64>,
    #[serde(default)]
    pub production_capacity: Option<i64>,
    #[serde(default)]
    pub scaling_notes: Option<String>,
    #[serde(default)]
    pub launch_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Price minus cost, when the cost is known.
    pub fn margin(&self) -> Option<Decimal> {
        self.cost.map(|cost| self.price - cost)
    }
}

impl TableRecord for Product {
    const TABLE: &'static str = "products";

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl_fields!(Product {
    id,
    sku,
    name,
    category,
    price,
    cost,
    status,
    target_units,
    launch_date,
    created_at,
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductIdea {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub estimated_cost: Option<Decimal>,
    #[serde(default)]
    pub status: IdeaStatus,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TableRecord for ProductIdea {
    const TABLE: &'static str = "product_ideas";

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl_fields!(ProductIdea {
    id,
    title,
    category,
    estimated_cost,
    status,
    created_at,
});

// =============================================================================
// Payloads
// =============================================================================

/// Input for [`Products::create`]. A missing SKU is generated by the backend.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NewProduct {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Decimal,
    pub cost: Option<Decimal>,
    pub status: ProductStatus,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::require_text(&mut errors, "name", Some(self.name.as_str()));
        validation::require_non_negative(&mut errors, "price", self.price);
        if let Some(cost) = self.cost {
            validation::require_non_negative(&mut errors, "cost", cost);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<Option<Decimal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
}

impl ProductPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(sku) = &self.sku {
            validation::require_text(&mut errors, "sku", Some(sku.as_str()));
        }
        if let Some(name) = &self.name {
            validation::require_text(&mut errors, "name", Some(name.as_str()));
        }
        if let Some(price) = self.price {
            validation::require_non_negative(&mut errors, "price", price);
        }
        if let Some(Some(cost)) = self.cost {
            validation::require_non_negative(&mut errors, "cost", cost);
        }
        errors.into_result()
    }
}

/// The scaling plan section of a product, written as a whole by the
/// auto-saver.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScalingPatch {
    pub target_units: Option<i64>,
    pub production_capacity: Option<i64>,
    pub scaling_notes: Option<String>,
    pub launch_date: Option<NaiveDate>,
}

impl ScalingPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        for (field, value) in [
            ("target_units", self.target_units),
            ("production_capacity", self.production_capacity),
        ] {
            if value.is_some_and(|v| v < 0) {
                errors.push_code(field, "Must not be negative", codes::NON_NEGATIVE);
            }
        }
        errors.into_result()
    }
}

impl From<&Product> for ScalingPatch {
    fn from(product: &Product) -> Self {
        Self {
            target_units: product.target_units,
            production_capacity: product.production_capacity,
            scaling_notes: product.scaling_notes.clone(),
            launch_date: product.launch_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NewIdea {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub estimated_cost: Option<Decimal>,
}

impl NewIdea {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::require_text(&mut errors, "title", Some(self.title.as_str()));
        if let Some(cost) = self.estimated_cost {
            validation::require_non_negative(&mut errors, "estimated_cost", cost);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct IdeaPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<Option<Decimal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<IdeaStatus>,
}

#[derive(Serialize)]
struct ImagePatch<'a> {
    image_url: &'a str,
    image_path: &'a str,
}

#[derive(Serialize)]
struct PromotedPatch {
    status: IdeaStatus,
    product_id: Uuid,
}

// =============================================================================
// Service
// =============================================================================

pub struct Products<'a> {
    client: &'a BizdeskClient,
}

impl<'a> Products<'a> {
    pub(crate) fn new(client: &'a BizdeskClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Product>, Error> {
        let query = Query::new().order(OrderBy::desc("created_at"));
        logged("list products", self.client.list::<Product>(&query).await)
    }

    pub async fn get(&self, id: Uuid) -> Result<Product, Error> {
        logged("get product", self.client.get_by_id::<Product>(id).await)
    }

    /// Asks the backend for the next SKU in a category.
    pub async fn generate_sku(&self, category: Option<&str>) -> Result<String, Error> {
        logged(
            "generate sku",
            self.client
                .rpc("generate_sku", &json!({ "p_category": category }))
                .await,
        )
    }

    pub async fn create(&self, new: &NewProduct) -> Result<Product, Error> {
        new.validate()?;

        let mut row = new.clone();
        row.name = new.name.trim().to_string();
        row.sku = match validation::non_blank(new.sku.as_deref()) {
            Some(sku) => Some(sku.to_string()),
            None => Some(self.generate_sku(new.category.as_deref()).await?),
        };
        logged("create product", self.client.insert::<Product, _>(&row).await)
    }

    pub async fn update(&self, id: Uuid, patch: &ProductPatch) -> Result<Product, Error> {
        patch.validate()?;
        logged("update product", self.client.update::<Product, _>(id, patch).await)
    }

    /// Deletes a product and its stored image.
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        let product = self.get(id).await?;
        logged("delete product", self.client.delete::<Product>(id).await)?;
        if let Some(path) = product.image_path {
            if let Err(e) = self.client.remove(PRODUCT_IMAGES_BUCKET, &[path]).await {
                warn!("removing image of product {} failed: {}", id, e);
            }
        }
        Ok(())
    }

    /// Stores a product image and points the product at it.
    ///
    /// The previous image, if any, is removed once the product is updated.
    /// If the update fails the new object is removed instead.
    pub async fn upload_image(
        &self,
        id: Uuid,
        file_name: &str,
        bytes: Vec<u8>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Product, Error> {
        let previous = self.get(id).await?.image_path;

        let path = object_path(&format!("products/{id}"), file_name);
        let stored = logged(
            "upload product image",
            self.client
                .upload(PRODUCT_IMAGES_BUCKET, &path, bytes, &UploadOptions::for_file(file_name), cancel)
                .await,
        )?;

        let patch = ImagePatch {
            image_url: &stored.public_url,
            image_path: &stored.path,
        };
        let product = match self.client.update::<Product, _>(id, &patch).await {
            Ok(product) => product,
            Err(e) => {
                let paths = [stored.path.clone()];
                return Err(compensate("set product image", e, || {
                    self.client.remove(PRODUCT_IMAGES_BUCKET, &paths)
                })
                .await);
            }
        };

        if let Some(old) = previous.filter(|old| *old != stored.path) {
            if let Err(e) = self.client.remove(PRODUCT_IMAGES_BUCKET, &[old]).await {
                warn!("removing previous image of product {} failed: {}", id, e);
            }
        }
        Ok(product)
    }

    /// Writes the scaling section of a product.
    pub async fn update_scaling(&self, id: Uuid, patch: &ScalingPatch) -> Result<Product, Error> {
        patch.validate()?;
        logged("update scaling", self.client.update::<Product, _>(id, patch).await)
    }

    /// Debounced writer for a product's scaling section.
    ///
    /// Each recorded value replaces the pending one; only the last value of a
    /// burst of edits reaches the backend.
    pub fn scaling_autosaver(&self, id: Uuid, config: AutosaveConfig) -> Autosaver<ScalingPatch> {
        let client = self.client.clone();
        Autosaver::spawn(config, move |patch: ScalingPatch| {
            let client = client.clone();
            async move { client.products().update_scaling(id, &patch).await.map(|_| ()) }
        })
    }

    // -------------------------------------------------------------------------
    // Ideas
    // -------------------------------------------------------------------------

    pub async fn list_ideas(&self) -> Result<Vec<ProductIdea>, Error> {
        let query = Query::new().order(OrderBy::desc("created_at"));
        logged("list ideas", self.client.list::<ProductIdea>(&query).await)
    }

    pub async fn create_idea(&self, new: &NewIdea) -> Result<ProductIdea, Error> {
        new.validate()?;
        logged("create idea", self.client.insert::<ProductIdea, _>(new).await)
    }

    pub async fn update_idea(&self, id: Uuid, patch: &IdeaPatch) -> Result<ProductIdea, Error> {
        if let Some(title) = &patch.title {
            let mut errors = ValidationErrors::new();
            validation::require_text(&mut errors, "title", Some(title.as_str()));
            errors.into_result()?;
        }
        logged("update idea", self.client.update::<ProductIdea, _>(id, patch).await)
    }

    pub async fn delete_idea(&self, id: Uuid) -> Result<(), Error> {
        logged("delete idea", self.client.delete::<ProductIdea>(id).await)
    }

    /// Turns an idea into a draft product and links the two.
    ///
    /// If the idea cannot be marked as promoted the new product is deleted.
    pub async fn promote_idea(&self, idea_id: Uuid) -> Result<(ProductIdea, Product), Error> {
        let idea = logged("get idea", self.client.get_by_id::<ProductIdea>(idea_id).await)?;
        match idea.status {
            IdeaStatus::Promoted => {
                return Err(Error::business(format!("Idea \"{}\" has already been promoted", idea.title)));
            }
            IdeaStatus::Rejected => {
                return Err(Error::business(format!("Idea \"{}\" was rejected", idea.title)));
            }
            _ => {}
        }

        let product = self
            .create(&NewProduct {
                name: idea.title.clone(),
                description: idea.description.clone(),
                category: idea.category.clone(),
                cost: idea.estimated_cost,
                ..NewProduct::default()
            })
            .await?;

        let patch = PromotedPatch {
            status: IdeaStatus::Promoted,
            product_id: product.id,
        };
        match self.client.update::<ProductIdea, _>(idea_id, &patch).await {
            Ok(idea) => Ok((idea, product)),
            Err(e) => Err(compensate("promote idea", e, || self.client.delete::<Product>(product.id)).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::tests::d;
    use crate::model::Fields;
    use crate::model::Value;

    #[test]
    fn test_new_product_validation() {
        let product = NewProduct {
            name: "  ".into(),
            price: d("-1"),
            cost: Some(d("-0.01")),
            ..NewProduct::default()
        };
        let err = product.validate().unwrap_err();
        assert!(err.has_code("name", codes::REQUIRED));
        assert!(err.has_code("price", codes::NON_NEGATIVE));
        assert!(err.has_code("cost", codes::NON_NEGATIVE));

        let ok = NewProduct {
            name: "Desk lamp".into(),
            price: d("19.99"),
            ..NewProduct::default()
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_missing_sku_is_not_sent() {
        let product = NewProduct {
            name: "Desk lamp".into(),
            ..NewProduct::default()
        };
        let body = serde_json::to_value(&product).unwrap();
        assert!(body.get("sku").is_none());
        assert_eq!(body["status"], "draft");
    }

    #[test]
    fn test_scaling_patch_sends_every_field() {
        let patch = ScalingPatch {
            target_units: Some(500),
            ..ScalingPatch::default()
        };
        assert_eq!(
            serde_json::to_value(&patch).unwrap(),
            json!({
                "target_units": 500,
                "production_capacity": null,
                "scaling_notes": null,
                "launch_date": null
            })
        );
    }

    #[test]
    fn test_scaling_patch_rejects_negative_counts() {
        let patch = ScalingPatch {
            target_units: Some(-5),
            production_capacity: Some(10),
            ..ScalingPatch::default()
        };
        let err = patch.validate().unwrap_err();
        assert!(err.has_code("target_units", codes::NON_NEGATIVE));
        assert!(err.for_field("production_capacity").is_none());
    }

    #[test]
    fn test_product_fields_and_margin() {
        let product: Product = serde_json::from_value(json!({
            "id": "00000000-0000-0000-0000-000000000002",
            "sku": "LMP-001",
            "name": "Desk lamp",
            "price": "20.00",
            "cost": "12.50",
            "status": "active"
        }))
        .unwrap();
        assert_eq!(product.margin(), Some(d("7.50")));
        assert_eq!(product.field("status"), Some(Value::String("active".into())));
        assert_eq!(product.field("image_url"), None);
    }
}
