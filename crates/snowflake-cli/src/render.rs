//! Plain-text rendering of dashboard screens.

use std::fmt::Write as _;

use snowflake_core::{
  dashboard::{Page, Screen},
  error::ReadError,
  guard::Route,
  load::{Gated, LoadState},
  record::{ChatMessage, FoodConditionRecord, Invoice, Product, RejectedItem, ReturnItem},
};

const DATE: &str = "%Y-%m-%d %H:%M";

/// Render `screen`, ending with a newline.
pub fn screen(screen: &Screen) -> String {
  let mut out = String::new();
  match &screen.page {
    Page::SignIn => {
      out.push_str("Not signed in. Run `snowflake sign-in --email <EMAIL>` to continue.\n");
    }
    Page::NotFound(path) => {
      let _ = writeln!(out, "No page at {path}. Try one of:");
      for route in Route::ALL.into_iter().filter(|r| *r != Route::Auth) {
        let _ = writeln!(out, "  {:<16} {}", route.path(), route.label());
      }
    }
    Page::Home(overview) => {
      let role = if overview.is_admin { "admin" } else { "member" };
      let _ = writeln!(out, "Signed in as {} ({role})", overview.email);
    }
    Page::Products(state) => list(&mut out, "Products", state, product),
    Page::Invoices(state) => list(&mut out, "Invoices", state, invoice),
    Page::Returns(state) => list(&mut out, "Returns", state, return_item),
    Page::FoodCondition { records, can_record } => {
      list(&mut out, "Food condition", records, inspection);
      if *can_record {
        out.push_str("Record an inspection with `snowflake add inspection`.\n");
      }
    }
    Page::Rejected(Gated::Granted(state)) => list(&mut out, "Rejected items", state, rejected),
    Page::Rejected(Gated::Denied) => {
      out.push_str("Access denied: rejected items are visible to admins only.\n");
    }
  }
  out
}

fn list<T>(out: &mut String, title: &str, state: &LoadState<Vec<T>, ReadError>, line: fn(&T) -> String) {
  match state {
    LoadState::Loading => {
      let _ = writeln!(out, "{title}: loading");
    }
    LoadState::Failed(e) => {
      let _ = writeln!(out, "{title}: failed to load ({e})");
    }
    LoadState::Loaded(items) if items.is_empty() => {
      let _ = writeln!(out, "{title}: none yet");
    }
    LoadState::Loaded(items) => {
      let _ = writeln!(out, "{title} ({})", items.len());
      for item in items {
        let _ = writeln!(out, "  {}", line(item));
      }
    }
  }
}

// ── Rows ─────────────────────────────────────────────────────────────────────

pub fn product(p: &Product) -> String {
  format!("{}  {}  price {}  stock {}", p.id, p.name, p.price, p.stock)
}

pub fn invoice(i: &Invoice) -> String {
  format!(
    "{}  {}  total {}  {:?}  {}",
    i.id,
    i.invoice_number,
    i.total_amount,
    i.status,
    i.created_at.format(DATE)
  )
}

pub fn return_item(r: &ReturnItem) -> String {
  format!("{}  {} x{}  {:?}  {}", r.id, r.product_name, r.quantity, r.status, r.reason)
}

pub fn inspection(f: &FoodConditionRecord) -> String {
  let fit = if f.fit_for_processing { "fit" } else { "unfit" };
  let mut line = format!(
    "{}  {}  {}  {fit}  {}",
    f.id,
    f.inspection_date.format(DATE),
    f.product_name,
    f.condition
  );
  if let Some(notes) = &f.notes {
    let _ = write!(line, "  ({notes})");
  }
  line
}

pub fn rejected(r: &RejectedItem) -> String {
  format!("{}  {} x{}  {:?}  {}", r.id, r.product_name, r.quantity, r.status, r.reason)
}

/// Render a dispute thread oldest first, marking the caller's own messages.
pub fn thread(messages: &[ChatMessage], is_own: impl Fn(&ChatMessage) -> bool) -> String {
  if messages.is_empty() {
    return "No messages yet.\n".into();
  }
  let mut out = String::new();
  for m in messages {
    let who = if is_own(m) { "you" } else { "them" };
    let _ = writeln!(out, "[{}] {who:>4}: {}", m.created_at.format(DATE), m.message);
  }
  out
}
