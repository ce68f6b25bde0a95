//! The generic tabular data API: tables, rows and queries.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One record as it travels to and from the data service.
pub type Row = serde_json::Map<String, serde_json::Value>;

// ─── Table ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
  Products,
  Invoices,
  Returns,
  FoodConditions,
  RejectedItems,
  ChatMessages,
  UserRoles,
}

impl Table {
  pub const ALL: [Table; 7] = [
    Table::Products,
    Table::Invoices,
    Table::Returns,
    Table::FoodConditions,
    Table::RejectedItems,
    Table::ChatMessages,
    Table::UserRoles,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Self::Products => "products",
      Self::Invoices => "invoices",
      Self::Returns => "returns",
      Self::FoodConditions => "food_conditions",
      Self::RejectedItems => "rejected_items",
      Self::ChatMessages => "chat_messages",
      Self::UserRoles => "user_roles",
    }
  }

  pub fn parse(s: &str) -> Option<Self> { Self::ALL.into_iter().find(|t| t.name() == s) }

  /// The column every insert stamps with the acting user's id.
  pub fn actor_column(&self) -> &'static str {
    match self {
      Self::Products | Self::Invoices | Self::Returns => "owner_id",
      Self::FoodConditions => "inspector_id",
      Self::RejectedItems => "seller_id",
      Self::ChatMessages => "sender_id",
      Self::UserRoles => "user_id",
    }
  }
}

impl fmt::Display for Table {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

// ─── Query ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Filter {
  Eq {
    column: String,
    value:  serde_json::Value,
  },
}

impl Filter {
  pub fn column(&self) -> &str {
    match self {
      Self::Eq { column, .. } => column,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
  pub column:    String,
  pub ascending: bool,
}

/// Parameters for [`crate::service::DataService::query`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
  pub table:   Table,
  #[serde(default)]
  pub filters: Vec<Filter>,
  pub order:   Option<Order>,
  pub limit:   Option<usize>,
}

impl Query {
  pub fn new(table: Table) -> Self {
    Self { table, filters: Vec::new(), order: None, limit: None }
  }

  pub fn eq(mut self, column: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
    self.filters.push(Filter::Eq { column: column.into(), value: value.into() });
    self
  }

  pub fn order_by(mut self, column: impl Into<String>, ascending: bool) -> Self {
    self.order = Some(Order { column: column.into(), ascending });
    self
  }

  pub fn limit(mut self, n: usize) -> Self {
    self.limit = Some(n);
    self
  }

  /// Returns the first column name that is not a plain identifier.
  pub fn invalid_column(&self) -> Option<&str> {
    self
      .filters
      .iter()
      .map(Filter::column)
      .chain(self.order.as_ref().map(|o| o.column.as_str()))
      .find(|c| !is_identifier(c))
  }
}

/// `[a-z_][a-z0-9_]*`
pub fn is_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_lowercase())
    && chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit())
}
