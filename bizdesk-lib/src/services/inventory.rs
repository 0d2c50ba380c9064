//! Inventory items and stock movements

use chrono::DateTime;
use chrono::Utc;
use log::debug;
use log::warn;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use super::compensate;
use super::logged;
use crate::BizdeskClient;
use crate::api::TableRecord;
use crate::api::query::Filter;
use crate::api::query::OrderBy;
use crate::api::query::Query;
use crate::calc::inventory::MovementType;
use crate::calc::inventory::StockLevels;
use crate::calc::inventory::StockStatus;
use crate::error::Error;
use crate::error::ValidationErrors;
use crate::model::Fields;
use crate::model::Value;
use crate::validation;
use crate::validation::MovementRequest;
use crate::validation::codes;
use crate::validation::validate_movement;

// =============================================================================
// Records
// =============================================================================

/// An `inventory_details` row: one item at one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    #[serde(default)]
    pub sku: Option<String>,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub quantity_on_hand: i64,
    #[serde(default)]
    pub quantity_reserved: i64,
    #[serde(default)]
    pub reorder_level: i64,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl InventoryItem {
    pub fn levels(&self) -> StockLevels {
        StockLevels::new(self.quantity_on_hand, self.quantity_reserved, self.reorder_level)
    }

    pub fn available(&self) -> i64 {
        self.levels().available()
    }

    pub fn stock_status(&self) -> StockStatus {
        self.levels().status()
    }

    /// `quantity_on_hand * unit_cost`, when the cost is known.
    pub fn stock_value(&self) -> Option<Decimal> {
        self.unit_cost
            .map(|cost| crate::calc::round_money(cost * Decimal::from(self.quantity_on_hand)))
    }
}

impl TableRecord for InventoryItem {
    const TABLE: &'static str = "inventory_details";

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

impl Fields for InventoryItem {
    fn field(&self, name: &str) -> Option<Value> {
        let value: Value = match name {
            "id" => self.id.into(),
            "product_id" => self.product_id.into(),
            "sku" => self.sku.clone().into(),
            "name" => self.name.clone().into(),
            "category" => self.category.clone().into(),
            "location" => self.location.clone().into(),
            "supplier" => self.supplier.clone().into(),
            "quantity_on_hand" => self.quantity_on_hand.into(),
            "quantity_reserved" => self.quantity_reserved.into(),
            "quantity_available" => self.available().into(),
            "reorder_level" => self.reorder_level.into(),
            "unit_cost" => self.unit_cost.into(),
            "stock_value" => self.stock_value().into(),
            "stock_status" => self.stock_status().into(),
            "updated_at" => self.updated_at.into(),
            _ => return None,
        };
        Some(value)
    }
}

/// An `inventory_movements` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i64,
    #[serde(default)]
    pub from_location: Option<String>,
    #[serde(default)]
    pub to_location: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    pub quantity_before: i64,
    pub quantity_after: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl TableRecord for StockMovement {
    const TABLE: &'static str = "inventory_movements";

    fn id(&self) -> Option<Uuid> {
        Some(self.id)
    }
}

/// Result of [`Inventory::record_movement`].
#[derive(Debug, Clone, PartialEq)]
pub struct MovementOutcome {
    pub movement: StockMovement,
    /// The source item after the movement.
    pub item: InventoryItem,
    /// The receiving item of a transfer.
    pub destination: Option<InventoryItem>,
}

// =============================================================================
// Payloads
// =============================================================================

/// Input for [`Inventory::create`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewInventoryItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    pub sku: Option<String>,
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub quantity_on_hand: i64,
    pub quantity_reserved: i64,
    pub reorder_level: i64,
    pub unit_cost: Option<Decimal>,
    pub supplier: Option<String>,
}

impl NewInventoryItem {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        validation::require_text(&mut errors, "name", Some(self.name.as_str()));
        check_quantity(&mut errors, "quantity_on_hand", self.quantity_on_hand);
        check_quantity(&mut errors, "quantity_reserved", self.quantity_reserved);
        check_quantity(&mut errors, "reorder_level", self.reorder_level);
        if let Some(cost) = self.unit_cost {
            validation::require_non_negative(&mut errors, "unit_cost", cost);
        }
        errors.into_result()
    }
}

/// Changes for [`Inventory::update`].
///
/// On-hand quantity is absent on purpose: it only changes through
/// [`Inventory::record_movement`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InventoryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_reserved: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reorder_level: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_cost: Option<Option<Decimal>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<Option<String>>,
}

impl InventoryPatch {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Some(name) = &self.name {
            validation::require_text(&mut errors, "name", Some(name.as_str()));
        }
        if let Some(reserved) = self.quantity_reserved {
            check_quantity(&mut errors, "quantity_reserved", reserved);
        }
        if let Some(level) = self.reorder_level {
            check_quantity(&mut errors, "reorder_level", level);
        }
        if let Some(Some(cost)) = self.unit_cost {
            validation::require_non_negative(&mut errors, "unit_cost", cost);
        }
        errors.into_result()
    }
}

fn check_quantity(errors: &mut ValidationErrors, field: &str, quantity: i64) {
    if quantity < 0 {
        errors.push_code(field, "Must not be negative", codes::NON_NEGATIVE);
    }
}

#[derive(Serialize)]
struct MovementRow<'a> {
    inventory_id: Uuid,
    movement_type: MovementType,
    quantity: i64,
    from_location: Option<&'a str>,
    to_location: Option<&'a str>,
    reason: Option<&'a str>,
    reference: Option<&'a str>,
    quantity_before: i64,
    quantity_after: i64,
}

fn on_hand_patch(on_hand: i64) -> serde_json::Value {
    json!({ "quantity_on_hand": on_hand, "updated_at": Utc::now() })
}

// =============================================================================
// Service
// =============================================================================

/// Inventory operations.
pub struct Inventory<'a> {
    client: &'a BizdeskClient,
}

impl<'a> Inventory<'a> {
    pub(crate) fn new(client: &'a BizdeskClient) -> Self {
        Self { client }
    }

    /// All items ordered by name.
    pub async fn list(&self) -> Result<Vec<InventoryItem>, Error> {
        let query = Query::new().order(OrderBy::asc("name").then_asc("location"));
        logged("list inventory", self.client.list::<InventoryItem>(&query).await)
    }

    pub async fn get(&self, id: Uuid) -> Result<InventoryItem, Error> {
        logged("get inventory item", self.client.get_by_id::<InventoryItem>(id).await)
    }

    pub async fn create(&self, new: &NewInventoryItem) -> Result<InventoryItem, Error> {
        new.validate()?;
        logged("create inventory item", self.client.insert(new).await)
    }

    pub async fn update(&self, id: Uuid, patch: &InventoryPatch) -> Result<InventoryItem, Error> {
        patch.validate()?;
        logged(
            "update inventory item",
            self.client.update::<InventoryItem, _>(id, patch).await,
        )
    }

    /// Deletes an item and its movement history.
    pub async fn delete(&self, id: Uuid) -> Result<(), Error> {
        let by_item = Query::new().filter(Filter::eq("inventory_id", id));
        logged(
            "delete movements",
            self.client.delete_where(StockMovement::TABLE, &by_item).await,
        )?;
        logged("delete inventory item", self.client.delete::<InventoryItem>(id).await)
    }

    /// Movement history of an item, newest first.
    pub async fn movements(&self, id: Uuid) -> Result<Vec<StockMovement>, Error> {
        let query = Query::new()
            .filter(Filter::eq("inventory_id", id))
            .order(OrderBy::desc("created_at"));
        logged("list movements", self.client.list::<StockMovement>(&query).await)
    }

    /// Items at or below their reorder level, emptiest first.
    pub async fn low_stock(&self) -> Result<Vec<InventoryItem>, Error> {
        let mut items: Vec<InventoryItem> = self
            .list()
            .await?
            .into_iter()
            .filter(|item| item.stock_status() != StockStatus::InStock)
            .collect();
        items.sort_by_key(InventoryItem::available);
        Ok(items)
    }

    /// Validates and records a stock movement, updating quantities.
    ///
    /// The source location defaults to the item's location. A transfer adds
    /// the quantity to the item with the same SKU (or name) at the
    /// destination, creating it if needed. Earlier steps are undone when a
    /// later one fails.
    pub async fn record_movement(&self, item_id: Uuid, request: &MovementRequest) -> Result<MovementOutcome, Error> {
        let item = self.get(item_id).await?;

        let mut request = request.clone();
        if validation::non_blank(request.from_location.as_deref()).is_none() {
            request.from_location = item.location.clone();
        }
        validate_movement(&request, &item.levels())?;

        let before = item.quantity_on_hand;
        let after = item.levels().after(request.kind, request.quantity).on_hand;

        let row = MovementRow {
            inventory_id: item.id,
            movement_type: request.kind,
            quantity: request.quantity,
            from_location: validation::non_blank(request.from_location.as_deref()),
            to_location: validation::non_blank(request.to_location.as_deref()),
            reason: validation::non_blank(request.reason.as_deref()),
            reference: validation::non_blank(request.reference.as_deref()),
            quantity_before: before,
            quantity_after: after,
        };
        let movement: StockMovement = logged("record movement", self.client.insert(&row).await)?;
        let movement_id = movement.id;

        let updated = match self
            .client
            .update::<InventoryItem, _>(item.id, &on_hand_patch(after))
            .await
        {
            Ok(updated) => updated,
            Err(e) => {
                return Err(compensate("update stock level", e, || {
                    self.client.delete::<StockMovement>(movement_id)
                })
                .await);
            }
        };

        let destination = match (request.kind, row.to_location) {
            (MovementType::Transfer, Some(to)) => match self.receive_transfer(&item, to, request.quantity).await {
                Ok(dest) => Some(dest),
                Err(e) => {
                    return Err(compensate("receive transfer", e, || async {
                        let reverted = self
                            .client
                            .update::<InventoryItem, _>(item.id, &on_hand_patch(before))
                            .await
                            .map(|_| ());
                        if let Err(revert_err) = &reverted {
                            warn!("could not restore stock level of {}: {}", item.id, revert_err);
                        }
                        self.client.delete::<StockMovement>(movement_id).await
                    })
                    .await);
                }
            },
            _ => None,
        };

        debug!(
            "{} {} x{} ({} -> {})",
            request.kind.as_str(),
            item.name,
            request.quantity,
            before,
            after
        );

        Ok(MovementOutcome {
            movement,
            item: updated,
            destination,
        })
    }

    async fn receive_transfer(&self, source: &InventoryItem, to: &str, quantity: i64) -> Result<InventoryItem, Error> {
        let same_item = match &source.sku {
            Some(sku) => Filter::eq("sku", sku.as_str()),
            None => Filter::eq("name", source.name.as_str()),
        };
        let query = Query::new()
            .filter(same_item)
            .filter(Filter::eq("location", to))
            .limit(1);
        let existing = self.client.list::<InventoryItem>(&query).await?.into_iter().next();

        match existing {
            Some(dest) => {
                self.client
                    .update::<InventoryItem, _>(dest.id, &on_hand_patch(dest.quantity_on_hand + quantity))
                    .await
            }
            None => {
                let new = NewInventoryItem {
                    product_id: source.product_id,
                    sku: source.sku.clone(),
                    name: source.name.clone(),
                    category: source.category.clone(),
                    location: Some(to.to_string()),
                    quantity_on_hand: quantity,
                    quantity_reserved: 0,
                    reorder_level: source.reorder_level,
                    unit_cost: source.unit_cost,
                    supplier: source.supplier.clone(),
                };
                self.client.insert(&new).await
            }
        }
    }
}
