//! Integration tests for `SqliteService` against an in-memory database,
//! driven through the core session, collection and thread types.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use snowflake_core::{
  Collection, Dashboard, DisputeThread, Gated, Page, Record, RoleResolver, SessionStore,
  error::{AuthError, ReadError, ValidationError, WriteError},
  identity::{AccessToken, Credentials, Role},
  record::{
    ChatMessage, FoodConditionRecord, NewFoodCondition, NewProduct, NewRejectedItem, Product,
    RejectedItem,
  },
  service::DataService,
  table::{Query, Row, Table},
};
use uuid::Uuid;

use crate::{Error, SqliteService};

async fn service() -> Arc<SqliteService> {
  Arc::new(SqliteService::open_in_memory().await.expect("in-memory store"))
}

/// Register `email` and return a signed-in session store for it.
async fn account(service: &Arc<SqliteService>, email: &str) -> SessionStore<SqliteService> {
  let sessions = SessionStore::new(service.clone());
  sessions
    .sign_up(Credentials::new(email, "secret1"))
    .await
    .unwrap();
  sessions
    .sign_in(Credentials::new(email, "secret1"))
    .await
    .unwrap();
  sessions
}

fn collection<R: Record>(sessions: &SessionStore<SqliteService>) -> Collection<SqliteService, R> {
  Collection::new(sessions.clone(), RoleResolver::new(sessions.clone()))
}

fn thread(sessions: &SessionStore<SqliteService>) -> DisputeThread<SqliteService> {
  DisputeThread::new(sessions.clone(), RoleResolver::new(sessions.clone()))
}

fn product(name: &str) -> NewProduct {
  NewProduct { name: name.into(), price: 12_500, stock: 10, ..Default::default() }
}

fn rejected(name: &str) -> NewRejectedItem {
  NewRejectedItem {
    product_name: name.into(),
    reason: "Packaging damaged".into(),
    quantity: 12,
    ..Default::default()
  }
}

// ─── Accounts and sessions ───────────────────────────────────────────────────

#[tokio::test]
async fn sign_up_then_sign_in() {
  let s = service().await;
  let user = s
    .sign_up(Credentials::new("Ana@Example.com ", "secret1"))
    .await
    .unwrap();

  let session = s
    .sign_in(Credentials::new("ana@example.com", "secret1"))
    .await
    .unwrap();
  assert_eq!(session.user_id, user);
  assert_eq!(session.email, "ana@example.com");
  assert!(!session.is_expired());
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = service().await;
  s.sign_up(Credentials::new("ana@example.com", "secret1"))
    .await
    .unwrap();
  let err = s
    .sign_up(Credentials::new("ANA@example.com", "another1"))
    .await
    .unwrap_err();
  assert!(matches!(err, AuthError::EmailTaken));
}

#[tokio::test]
async fn short_password_never_reaches_the_table() {
  let s = service().await;
  let err = s
    .sign_up(Credentials::new("ana@example.com", "12345"))
    .await
    .unwrap_err();
  assert!(matches!(err, AuthError::Validation(ValidationError::Invalid { field: "password", .. })));

  let err = s
    .sign_in(Credentials::new("ana@example.com", "12345"))
    .await
    .unwrap_err();
  assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn wrong_password_is_invalid_credentials() {
  let s = service().await;
  s.sign_up(Credentials::new("ana@example.com", "secret1"))
    .await
    .unwrap();
  let err = s
    .sign_in(Credentials::new("ana@example.com", "secret2"))
    .await
    .unwrap_err();
  assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn session_resolves_until_sign_out() {
  let s = service().await;
  let sessions = account(&s, "ana@example.com").await;
  let session = sessions.current().unwrap();

  assert_eq!(s.get_session(&session.token).await.unwrap(), Some(session.clone()));

  sessions.sign_out().await.unwrap();
  assert_eq!(s.get_session(&session.token).await.unwrap(), None);
  let err = s
    .query(&session.token, &Query::new(Table::Products))
    .await
    .unwrap_err();
  assert!(matches!(err, ReadError::Unauthenticated));
}

#[tokio::test]
async fn restore_resumes_a_persisted_token() {
  let s = service().await;
  let token = account(&s, "ana@example.com").await.current().unwrap().token;

  let fresh = SessionStore::new(s.clone());
  let restored = fresh.restore(token).await.unwrap();
  assert_eq!(restored.map(|r| r.email), Some("ana@example.com".into()));
  assert!(fresh.current().is_some());

  let unknown = SessionStore::new(s.clone());
  let bogus = AccessToken::new("not-a-token");
  assert_eq!(unknown.restore(bogus).await.unwrap(), None);
  assert!(unknown.current().is_none());
}

#[tokio::test]
async fn expired_sessions_are_dead_and_purged() {
  let s = Arc::new(
    SqliteService::open_in_memory()
      .await
      .unwrap()
      .with_session_ttl(Duration::zero()),
  );
  s.sign_up(Credentials::new("ana@example.com", "secret1"))
    .await
    .unwrap();
  let session = s
    .sign_in(Credentials::new("ana@example.com", "secret1"))
    .await
    .unwrap();

  assert_eq!(s.get_session(&session.token).await.unwrap(), None);
  let err = s
    .insert(&session.token, Table::Products, Row::new())
    .await
    .unwrap_err();
  assert!(matches!(err, WriteError::Unauthenticated));
  assert_eq!(s.purge_expired_sessions().await.unwrap(), 1);
}

// ─── Roles ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn granted_role_is_visible_to_its_holder_only() {
  let s = service().await;
  let ana = account(&s, "ana@example.com").await;
  let budi = account(&s, "budi@example.com").await;
  let ana_id = ana.current().unwrap().user_id;

  let roles = RoleResolver::new(ana.clone());
  assert!(!roles.has_role(&ana_id, Role::Admin).await);

  let assignment = s.grant_role("ANA@example.com", Role::Admin).await.unwrap();
  assert_eq!(assignment.user_id, ana_id);
  assert!(roles.has_role(&ana_id, Role::Admin).await);
  assert!(!roles.has_role(&ana_id, Role::Moderator).await);

  // Budi cannot see Ana's assignment, so from Budi's session she is not admin.
  assert!(!RoleResolver::new(budi).has_role(&ana_id, Role::Admin).await);
}

#[tokio::test]
async fn granting_twice_keeps_one_assignment() {
  let s = service().await;
  let ana = account(&s, "ana@example.com").await;
  let first = s.grant_role("ana@example.com", Role::Admin).await.unwrap();
  let second = s.grant_role("ana@example.com", Role::Admin).await.unwrap();
  assert_eq!(first.created_at, second.created_at);

  let roles = s.roles_of(ana.current().unwrap().user_id).await.unwrap();
  assert_eq!(roles.len(), 1);
  assert_eq!(roles[0].role, Role::Admin);
}

#[tokio::test]
async fn grant_to_unknown_email_fails() {
  let s = service().await;
  let err = s.grant_role("ghost@example.com", Role::Admin).await.unwrap_err();
  assert!(matches!(err, Error::UnknownUser(email) if email == "ghost@example.com"));
}

#[tokio::test]
async fn roles_cannot_be_self_assigned() {
  let s = service().await;
  let ana = account(&s, "ana@example.com").await;
  let session = ana.current().unwrap();

  let mut row = Row::new();
  row.insert("user_id".into(), json!(session.user_id));
  row.insert("role".into(), json!("admin"));
  let err = s.insert(&session.token, Table::UserRoles, row).await.unwrap_err();
  assert!(matches!(err, WriteError::Denied(_)));
  assert!(!RoleResolver::new(ana).has_role(&session.user_id, Role::Admin).await);
}

// ─── Resource rows ───────────────────────────────────────────────────────────

#[tokio::test]
async fn users_read_only_their_own_products() {
  let s = service().await;
  let ana = account(&s, "ana@example.com").await;
  let budi = account(&s, "budi@example.com").await;

  collection::<Product>(&ana).create(product("Rice 5kg")).await.unwrap();
  collection::<Product>(&budi).create(product("Palm oil 2L")).await.unwrap();

  let listed = collection::<Product>(&ana).list().await.unwrap();
  assert_eq!(listed.len(), 1);
  assert_eq!(listed[0].name, "Rice 5kg");
  assert_eq!(listed[0].owner_id, ana.current().unwrap().user_id);

  s.grant_role("budi@example.com", Role::Admin).await.unwrap();
  assert_eq!(collection::<Product>(&budi).list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn list_is_newest_first_even_within_one_tick() {
  let s = service().await;
  let ana = account(&s, "ana@example.com").await;
  let products = collection::<Product>(&ana);
  for name in ["first", "second", "third", "fourth"] {
    products.create(product(name)).await.unwrap();
  }

  let names: Vec<_> = products
    .list()
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.name)
    .collect();
  assert_eq!(names, ["fourth", "third", "second", "first"]);
}

#[tokio::test]
async fn actor_column_cannot_be_forged() {
  let s = service().await;
  let ana = account(&s, "ana@example.com").await;
  let budi = account(&s, "budi@example.com").await;

  let mut row = Row::new();
  row.insert("name".into(), json!("Sugar"));
  row.insert("price".into(), json!(1));
  row.insert("stock".into(), json!(1));
  row.insert("owner_id".into(), json!(budi.current().unwrap().user_id));
  let err = s
    .insert(&ana.current().unwrap().token, Table::Products, row)
    .await
    .unwrap_err();
  assert!(matches!(err, WriteError::Denied(reason) if reason.contains("owner_id")));
}

#[tokio::test]
async fn server_assigns_id_and_timestamp() {
  let s = service().await;
  let ana = account(&s, "ana@example.com").await;
  let before = Utc::now() - Duration::seconds(1);

  let mut row = Row::new();
  row.insert("id".into(), json!(Uuid::nil()));
  row.insert("name".into(), json!("Flour"));
  row.insert("price".into(), json!(9_000));
  row.insert("stock".into(), json!(4));
  row.insert("description".into(), Value::Null);
  let stored = s
    .insert(&ana.current().unwrap().token, Table::Products, row)
    .await
    .unwrap();

  let product: Product = serde_json::from_value(Value::Object(stored)).unwrap();
  assert_ne!(product.id, Uuid::nil());
  assert!(product.created_at > before);
}

#[tokio::test]
async fn filters_match_json_values() {
  let s = service().await;
  let ana = account(&s, "ana@example.com").await;
  let products = collection::<Product>(&ana);
  products.create(product("Rice 5kg")).await.unwrap();
  products
    .create(NewProduct { name: "Salt".into(), price: 3_000, stock: 0, ..Default::default() })
    .await
    .unwrap();

  let token = ana.current().unwrap().token;
  let rows = s
    .query(&token, &Query::new(Table::Products).eq("stock", 0))
    .await
    .unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0]["name"], json!("Salt"));

  let rows = s
    .query(&token, &Query::new(Table::Products).eq("description", Value::Null))
    .await
    .unwrap();
  assert_eq!(rows.len(), 2);

  let rows = s
    .query(&token, &Query::new(Table::Products).order_by("price", true).limit(1))
    .await
    .unwrap();
  assert_eq!(rows[0]["name"], json!("Salt"));
}

#[tokio::test]
async fn hostile_column_names_are_refused() {
  let s = service().await;
  let ana = account(&s, "ana@example.com").await;
  let query = Query::new(Table::Products).order_by("name') OR 1=1 --", true);
  let err = s
    .query(&ana.current().unwrap().token, &query)
    .await
    .unwrap_err();
  assert!(matches!(err, ReadError::InvalidQuery(_)));
}

// ─── Food condition ──────────────────────────────────────────────────────────

#[tokio::test]
async fn only_admins_record_inspections_but_everyone_reads_them() {
  let s = service().await;
  let admin = account(&s, "qc@example.com").await;
  let seller = account(&s, "seller@example.com").await;
  s.grant_role("qc@example.com", Role::Admin).await.unwrap();

  let draft = || NewFoodCondition {
    product_name: "Tomatoes".into(),
    condition: "Fresh".into(),
    ..Default::default()
  };

  let err = collection::<FoodConditionRecord>(&seller)
    .create(draft())
    .await
    .unwrap_err();
  assert!(matches!(err, WriteError::Forbidden(Role::Admin)));

  // Straight to the service, skipping the client-side check.
  let row = match serde_json::to_value(draft()).unwrap() {
    Value::Object(row) => row,
    _ => unreachable!(),
  };
  let err = s
    .insert(&seller.current().unwrap().token, Table::FoodConditions, row)
    .await
    .unwrap_err();
  assert!(matches!(err, WriteError::Denied(_)));

  let record = collection::<FoodConditionRecord>(&admin)
    .create(draft())
    .await
    .unwrap();
  assert_eq!(record.inspection_date, record.created_at);
  assert!(record.fit_for_processing);

  let seen = collection::<FoodConditionRecord>(&seller).list().await.unwrap();
  assert_eq!(seen, vec![record]);
}

#[tokio::test]
async fn inspections_order_by_inspection_date() {
  let s = service().await;
  let admin = account(&s, "qc@example.com").await;
  s.grant_role("qc@example.com", Role::Admin).await.unwrap();
  let inspections = collection::<FoodConditionRecord>(&admin);

  inspections
    .create(NewFoodCondition {
      product_name: "Today".into(),
      condition: "Fresh".into(),
      ..Default::default()
    })
    .await
    .unwrap();
  inspections
    .create(NewFoodCondition {
      product_name: "Last week".into(),
      condition: "Expired".into(),
      fit_for_processing: false,
      inspection_date: Some(Utc::now() - Duration::days(7)),
      ..Default::default()
    })
    .await
    .unwrap();

  let names: Vec<_> = inspections
    .list()
    .await
    .unwrap()
    .into_iter()
    .map(|r| r.product_name)
    .collect();
  assert_eq!(names, ["Today", "Last week"]);
}

// ─── Dispute threads ─────────────────────────────────────────────────────────

#[tokio::test]
async fn seller_and_admin_share_a_thread() {
  let s = service().await;
  let admin = account(&s, "qc@example.com").await;
  let seller = account(&s, "seller@example.com").await;
  let outsider = account(&s, "other@example.com").await;
  s.grant_role("qc@example.com", Role::Admin).await.unwrap();

  let item = collection::<RejectedItem>(&seller)
    .create(rejected("Eggs"))
    .await
    .unwrap();

  thread(&admin)
    .send(item.id, "Twelve trays arrived cracked.")
    .await
    .unwrap();
  let messages = thread(&seller)
    .send(item.id, "  The courier dropped them.  ")
    .await
    .unwrap();

  let bodies: Vec<_> = messages.iter().map(|m| m.message.as_str()).collect();
  assert_eq!(bodies, ["Twelve trays arrived cracked.", "The courier dropped them."]);
  assert!(!thread(&seller).is_own(&messages[0]));
  assert!(thread(&seller).is_own(&messages[1]));

  let admin_view = thread(&admin).list_messages(item.id).await.unwrap();
  assert_eq!(admin_view, messages);

  // Neither the item's seller nor an admin: nothing to read, nothing to send.
  assert!(thread(&outsider).list_messages(item.id).await.unwrap().is_empty());
  let err = thread(&outsider).send(item.id, "Hello?").await.unwrap_err();
  assert!(matches!(err, WriteError::Denied(_)));
}

#[tokio::test]
async fn messages_need_an_existing_item() {
  let s = service().await;
  let admin = account(&s, "qc@example.com").await;
  s.grant_role("qc@example.com", Role::Admin).await.unwrap();

  let err = thread(&admin).send(Uuid::new_v4(), "Anyone?").await.unwrap_err();
  assert!(matches!(err, WriteError::Denied(reason) if reason.contains("does not exist")));
}

#[tokio::test]
async fn thread_lists_only_its_own_messages() {
  let s = service().await;
  let seller = account(&s, "seller@example.com").await;
  let items = collection::<RejectedItem>(&seller);
  let eggs = items.create(rejected("Eggs")).await.unwrap();
  let milk = items.create(rejected("Milk")).await.unwrap();

  thread(&seller).send(eggs.id, "About the eggs").await.unwrap();
  thread(&seller).send(milk.id, "About the milk").await.unwrap();

  let eggs_thread: Vec<ChatMessage> = thread(&seller).list_messages(eggs.id).await.unwrap();
  assert_eq!(eggs_thread.len(), 1);
  assert_eq!(eggs_thread[0].rejected_item_id, eggs.id);
}

// ─── Row contents ────────────────────────────────────────────────────────────

fn object(value: Value) -> Row {
  match value {
    Value::Object(map) => map,
    other => panic!("expected an object, got {other}"),
  }
}

#[tokio::test]
async fn malformed_rows_are_refused_and_lists_still_load() {
  let s = service().await;
  let seller = account(&s, "seller@example.com").await;
  let admin = account(&s, "qc@example.com").await;
  s.grant_role("qc@example.com", Role::Admin).await.unwrap();
  let token = seller.current().unwrap().token;

  collection::<RejectedItem>(&seller).create(rejected("Eggs")).await.unwrap();

  let bad_rows = [
    // missing reason
    json!({ "product_name": "Milk", "quantity": 3 }),
    // negative quantity
    json!({ "product_name": "Milk", "reason": "Sour", "quantity": -3 }),
    // wrong type
    json!({ "product_name": "Milk", "reason": "Sour", "quantity": "three" }),
  ];
  for row in bad_rows {
    let err = s
      .insert(&token, Table::RejectedItems, object(row.clone()))
      .await
      .unwrap_err();
    assert!(matches!(err, WriteError::Validation(_)), "{row} gave {err:?}");
  }

  assert_eq!(collection::<RejectedItem>(&seller).list().await.unwrap().len(), 1);
  assert_eq!(collection::<RejectedItem>(&admin).list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn blank_chat_body_is_refused_by_the_store() {
  let s = service().await;
  let seller = account(&s, "seller@example.com").await;
  let token = seller.current().unwrap().token;
  let item = collection::<RejectedItem>(&seller).create(rejected("Eggs")).await.unwrap();

  let err = s
    .insert(
      &token,
      Table::ChatMessages,
      object(json!({ "rejected_item_id": item.id, "message": "   " })),
    )
    .await
    .unwrap_err();
  assert!(matches!(err, WriteError::Validation(ValidationError::Required("message"))));

  let stored = s
    .insert(
      &token,
      Table::ChatMessages,
      object(json!({ "rejected_item_id": item.id, "message": "  Shells cracked  " })),
    )
    .await
    .unwrap();
  assert_eq!(stored.get("message"), Some(&json!("Shells cracked")));

  let messages = thread(&seller).list_messages(item.id).await.unwrap();
  assert_eq!(messages.len(), 1);
  assert_eq!(messages[0].message, "Shells cracked");
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn rejected_page_is_admin_only() {
  let s = service().await;
  let seller = account(&s, "seller@example.com").await;
  collection::<RejectedItem>(&seller)
    .create(rejected("Eggs"))
    .await
    .unwrap();
  s.sign_up(Credentials::new("qc@example.com", "secret1"))
    .await
    .unwrap();
  s.grant_role("qc@example.com", Role::Admin).await.unwrap();

  let mut dash = Dashboard::new(s.clone());
  dash
    .sessions()
    .sign_in(Credentials::new("seller@example.com", "secret1"))
    .await
    .unwrap();
  let Page::Rejected(gate) = dash.open("/rejected").await.page else {
    panic!("expected the rejected page")
  };
  assert!(matches!(gate, Gated::Denied));

  dash.sessions().sign_out().await.unwrap();
  dash
    .sessions()
    .sign_in(Credentials::new("qc@example.com", "secret1"))
    .await
    .unwrap();
  let Page::Rejected(Gated::Granted(state)) = dash.open("/rejected").await.page else {
    panic!("expected granted")
  };
  assert_eq!(state.loaded().map(Vec::len), Some(1));
}
