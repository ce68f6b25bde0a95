//! Record types for every resource collection, and the drafts that create
//! them.
//!
//! Records are immutable once created. The data service assigns `id` and
//! `created_at`; the collection stamps the actor column (`owner_id`,
//! `inspector_id`, `seller_id`, `sender_id`) from the live session. Drafts
//! therefore carry neither.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{
  error::ValidationError,
  identity::{Role, UserId},
  table::Table,
};

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Form input that can be checked before anything is sent.
pub trait Draft: Serialize + Send + Sync {
  fn validate(&self) -> Result<(), ValidationError>;
}

/// A record type backed by one table.
pub trait Record: DeserializeOwned + Send + Sync + 'static {
  const TABLE: Table;
  /// Column the list view orders by.
  const ORDER_COLUMN: &'static str = "created_at";
  /// Newest first unless a record says otherwise.
  const ASCENDING: bool = false;
  /// Role the acting identity must hold to create one.
  const CREATE_ROLE: Option<Role> = None;

  type Draft: Draft;

  fn id(&self) -> Uuid;
  fn created_at(&self) -> DateTime<Utc>;
}

fn required(field: &'static str, value: &str) -> Result<(), ValidationError> {
  if value.trim().is_empty() {
    Err(ValidationError::Required(field))
  } else {
    Ok(())
  }
}

fn non_negative(field: &'static str, value: i64) -> Result<(), ValidationError> {
  if value < 0 {
    Err(ValidationError::Invalid { field, reason: "must not be negative" })
  } else {
    Ok(())
  }
}

fn positive(field: &'static str, value: u32) -> Result<(), ValidationError> {
  if value == 0 {
    Err(ValidationError::Invalid { field, reason: "must be at least 1" })
  } else {
    Ok(())
  }
}

// ─── Products ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
  pub id:          Uuid,
  pub owner_id:    UserId,
  pub name:        String,
  pub description: Option<String>,
  /// Unit price in whole rupiah.
  pub price:       i64,
  pub stock:       u32,
  pub created_at:  DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProduct {
  pub name:        String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub price:       i64,
  pub stock:       u32,
}

impl Draft for NewProduct {
  fn validate(&self) -> Result<(), ValidationError> {
    required("name", &self.name)?;
    non_negative("price", self.price)
  }
}

impl Record for Product {
  const TABLE: Table = Table::Products;

  type Draft = NewProduct;

  fn id(&self) -> Uuid { self.id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }
}

// ─── Invoices ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
  #[default]
  Pending,
  Paid,
  Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
  pub id:             Uuid,
  pub owner_id:       UserId,
  pub invoice_number: String,
  /// Total in whole rupiah.
  pub total_amount:   i64,
  pub status:         InvoiceStatus,
  pub created_at:     DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewInvoice {
  pub invoice_number: String,
  pub total_amount:   i64,
  #[serde(default)]
  pub status:         InvoiceStatus,
}

impl Draft for NewInvoice {
  fn validate(&self) -> Result<(), ValidationError> {
    required("invoice_number", &self.invoice_number)?;
    non_negative("total_amount", self.total_amount)
  }
}

impl Record for Invoice {
  const TABLE: Table = Table::Invoices;

  type Draft = NewInvoice;

  fn id(&self) -> Uuid { self.id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }
}

// ─── Returns ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnStatus {
  #[default]
  Pending,
  Approved,
  Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnItem {
  pub id:           Uuid,
  pub owner_id:     UserId,
  pub product_name: String,
  pub quantity:     u32,
  pub reason:       String,
  pub status:       ReturnStatus,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewReturnItem {
  pub product_name: String,
  pub quantity:     u32,
  pub reason:       String,
  #[serde(default)]
  pub status:       ReturnStatus,
}

impl Draft for NewReturnItem {
  fn validate(&self) -> Result<(), ValidationError> {
    required("product_name", &self.product_name)?;
    required("reason", &self.reason)?;
    positive("quantity", self.quantity)
  }
}

impl Record for ReturnItem {
  const TABLE: Table = Table::Returns;

  type Draft = NewReturnItem;

  fn id(&self) -> Uuid { self.id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }
}

// ─── Food condition inspections ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoodConditionRecord {
  pub id:                 Uuid,
  pub inspector_id:       UserId,
  pub product_name:       String,
  /// Free text, e.g. "Fresh", "Slightly damaged", "Expired".
  pub condition:          String,
  pub fit_for_processing: bool,
  pub notes:              Option<String>,
  pub inspection_date:    DateTime<Utc>,
  pub created_at:         DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFoodCondition {
  pub product_name:       String,
  pub condition:          String,
  pub fit_for_processing: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub notes:              Option<String>,
  /// Defaults to the creation time when absent.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub inspection_date:    Option<DateTime<Utc>>,
}

impl Default for NewFoodCondition {
  fn default() -> Self {
    Self {
      product_name:       String::new(),
      condition:          String::new(),
      fit_for_processing: true,
      notes:              None,
      inspection_date:    None,
    }
  }
}

impl Draft for NewFoodCondition {
  fn validate(&self) -> Result<(), ValidationError> {
    required("product_name", &self.product_name)?;
    required("condition", &self.condition)
  }
}

impl Record for FoodConditionRecord {
  const TABLE: Table = Table::FoodConditions;
  const ORDER_COLUMN: &'static str = "inspection_date";
  const CREATE_ROLE: Option<Role> = Some(Role::Admin);

  type Draft = NewFoodCondition;

  fn id(&self) -> Uuid { self.id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }
}

// ─── Rejected items ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RejectionStatus {
  #[default]
  Rejected,
  Disputed,
  Resolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedItem {
  pub id:           Uuid,
  pub seller_id:    UserId,
  pub product_name: String,
  pub reason:       String,
  pub quantity:     u32,
  pub status:       RejectionStatus,
  pub created_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewRejectedItem {
  pub product_name: String,
  pub reason:       String,
  pub quantity:     u32,
  #[serde(default)]
  pub status:       RejectionStatus,
}

impl Draft for NewRejectedItem {
  fn validate(&self) -> Result<(), ValidationError> {
    required("product_name", &self.product_name)?;
    required("reason", &self.reason)?;
    positive("quantity", self.quantity)
  }
}

impl Record for RejectedItem {
  const TABLE: Table = Table::RejectedItems;

  type Draft = NewRejectedItem;

  fn id(&self) -> Uuid { self.id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }
}

// ─── Chat messages ───────────────────────────────────────────────────────────

/// One message in the dispute thread of a [`RejectedItem`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
  pub id:               Uuid,
  pub rejected_item_id: Uuid,
  pub sender_id:        UserId,
  pub message:          String,
  pub created_at:       DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChatMessage {
  pub rejected_item_id: Uuid,
  pub message:          String,
}

impl Draft for NewChatMessage {
  fn validate(&self) -> Result<(), ValidationError> { required("message", &self.message) }
}

impl Record for ChatMessage {
  const TABLE: Table = Table::ChatMessages;
  const ASCENDING: bool = true;

  type Draft = NewChatMessage;

  fn id(&self) -> Uuid { self.id }

  fn created_at(&self) -> DateTime<Utc> { self.created_at }
}
