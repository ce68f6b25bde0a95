//! Row-level policies: which rows a user may read, and which inserts they
//! may make.
//!
//! | Table                        | Read                              | Insert                          |
//! |------------------------------|-----------------------------------|---------------------------------|
//! | products, invoices, returns  | own rows; admins all              | any signed-in user              |
//! | food_conditions              | every signed-in user              | admins only                     |
//! | rejected_items               | own rows (seller); admins all     | any signed-in user              |
//! | chat_messages                | sender or item seller; admins all | admin or seller of the parent   |
//! | user_roles                   | own assignments                   | never                           |
//!
//! In every case the row's actor column must be the inserting user.

use rusqlite::{Connection, OptionalExtension as _, types::Value as SqlValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use snowflake_core::{
  error::ValidationError,
  record::{
    Draft, NewChatMessage, NewFoodCondition, NewInvoice, NewProduct, NewRejectedItem,
    NewReturnItem,
  },
  table::{Filter, Query, Row, Table},
};

use crate::encode::sql_value;

// ─── Reads ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadScope {
  All,
  /// Rows whose actor column is the user.
  Own,
  /// Messages the user sent, or on items the user is the seller of.
  DisputeParticipant,
}

pub fn read_scope(table: Table, is_admin: bool) -> ReadScope {
  match table {
    Table::UserRoles => ReadScope::Own,
    Table::FoodConditions => ReadScope::All,
    _ if is_admin => ReadScope::All,
    Table::ChatMessages => ReadScope::DisputeParticipant,
    Table::Products | Table::Invoices | Table::Returns | Table::RejectedItems => ReadScope::Own,
  }
}

/// A parameterised `SELECT data_json ...` for one query.
pub struct Select {
  pub sql:    String,
  pub params: Vec<SqlValue>,
}

/// Build the statement for `query` as seen by `user_id`.
///
/// Column names are interpolated, so the caller must have checked them with
/// [`Query::invalid_column`] first.
pub fn select(query: &Query, scope: ReadScope, user_id: &str) -> Select {
  let source = match query.table {
    Table::UserRoles => "role_rows",
    _ => "records",
  };
  let mut sql = format!("SELECT data_json FROM {source} WHERE table_name = ?");
  let mut params = vec![SqlValue::Text(query.table.name().to_owned())];

  match scope {
    ReadScope::All => {}
    ReadScope::Own => {
      sql.push_str(" AND actor_id = ?");
      params.push(SqlValue::Text(user_id.to_owned()));
    }
    ReadScope::DisputeParticipant => {
      sql.push_str(
        " AND (actor_id = ? OR json_extract(data_json, '$.rejected_item_id') IN (
             SELECT record_id FROM records
             WHERE table_name = 'rejected_items' AND actor_id = ?))",
      );
      params.push(SqlValue::Text(user_id.to_owned()));
      params.push(SqlValue::Text(user_id.to_owned()));
    }
  }

  for filter in &query.filters {
    match filter {
      Filter::Eq { column, value } => match sql_value(value) {
        Some(v) => {
          sql.push_str(&format!(" AND json_extract(data_json, '$.{column}') = ?"));
          params.push(v);
        }
        None => sql.push_str(&format!(" AND json_extract(data_json, '$.{column}') IS NULL")),
      },
    }
  }

  match &query.order {
    Some(order) => {
      let dir = if order.ascending { "ASC" } else { "DESC" };
      sql.push_str(&format!(
        " ORDER BY json_extract(data_json, '$.{}') {dir}, seq {dir}",
        order.column
      ));
    }
    None => sql.push_str(" ORDER BY seq ASC"),
  }

  if let Some(limit) = query.limit {
    sql.push_str(" LIMIT ?");
    params.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
  }

  Select { sql, params }
}

// ─── Inserts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InsertRule {
  AnyUser,
  AdminOnly,
  /// Admins or the seller of the referenced rejected item.
  ParentSeller,
  Never,
}

fn insert_rule(table: Table) -> InsertRule {
  match table {
    Table::Products | Table::Invoices | Table::Returns | Table::RejectedItems => {
      InsertRule::AnyUser
    }
    Table::FoodConditions => InsertRule::AdminOnly,
    Table::ChatMessages => InsertRule::ParentSeller,
    Table::UserRoles => InsertRule::Never,
  }
}

/// Decide whether `user_id` may insert `row` into `table`. The inner `Err`
/// carries the reason for a denial.
pub fn check_insert(
  conn: &Connection,
  table: Table,
  row: &Row,
  user_id: &str,
  is_admin: bool,
) -> rusqlite::Result<Result<(), String>> {
  let actor_column = table.actor_column();
  match row.get(actor_column) {
    None => {}
    Some(Value::String(actor)) if actor == user_id => {}
    Some(_) => return Ok(Err(format!("{actor_column} must be the signed-in user"))),
  }

  let verdict = match insert_rule(table) {
    InsertRule::AnyUser => Ok(()),
    InsertRule::AdminOnly if is_admin => Ok(()),
    InsertRule::AdminOnly => Err(format!("only admins may insert into {table}")),
    InsertRule::Never => Err(format!("{table} is not writable through the data API")),
    InsertRule::ParentSeller => {
      let Some(Value::String(parent)) = row.get("rejected_item_id") else {
        return Ok(Err("rejected_item_id is required".into()));
      };
      let seller: Option<String> = conn
        .query_row(
          "SELECT actor_id FROM records
           WHERE table_name = 'rejected_items' AND record_id = ?1",
          rusqlite::params![parent],
          |r| r.get(0),
        )
        .optional()?;
      match seller {
        None => Err(format!("rejected item {parent} does not exist")),
        Some(_) if is_admin => Ok(()),
        Some(seller) if seller == user_id => Ok(()),
        Some(_) => Err("only the seller or an admin may post in this thread".into()),
      }
    }
  };
  Ok(verdict)
}

// ─── Contents ────────────────────────────────────────────────────────────────

/// Check `row` against the form for `table` and return it in stored shape:
/// defaults filled in, unknown keys dropped, chat bodies trimmed.
///
/// Every stored row must decode as its record type, or the whole list it
/// belongs to stops loading.
pub fn normalise_row(table: Table, mut row: Row) -> Result<Row, ValidationError> {
  match table {
    Table::Products => through_draft::<NewProduct>(row),
    Table::Invoices => through_draft::<NewInvoice>(row),
    Table::Returns => through_draft::<NewReturnItem>(row),
    Table::FoodConditions => through_draft::<NewFoodCondition>(row),
    Table::RejectedItems => through_draft::<NewRejectedItem>(row),
    Table::ChatMessages => {
      if let Some(Value::String(message)) = row.get_mut("message") {
        *message = message.trim().to_owned();
      }
      through_draft::<NewChatMessage>(row)
    }
    Table::UserRoles => Err(ValidationError::Malformed(format!("{table} has no insert form"))),
  }
}

fn through_draft<D: Draft + DeserializeOwned>(row: Row) -> Result<Row, ValidationError> {
  let malformed = |e: serde_json::Error| ValidationError::Malformed(e.to_string());
  let draft: D = serde_json::from_value(Value::Object(row)).map_err(malformed)?;
  draft.validate()?;
  match serde_json::to_value(&draft).map_err(malformed)? {
    Value::Object(row) => Ok(row),
    _ => Err(ValidationError::Malformed("expected a JSON object".into())),
  }
}
