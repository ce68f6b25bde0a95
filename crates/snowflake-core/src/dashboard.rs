//! [`Dashboard`]: the injectable context that ties the session store, role
//! resolver and route guard together and maps each route to its page.

use std::sync::Arc;

use crate::{
  collection::Collection,
  guard::{Navigation, Route, RouteGuard},
  identity::{Role, Session},
  load::{Gated, LoadState},
  record::{FoodConditionRecord, Invoice, Product, Record, RejectedItem, ReturnItem},
  role::{Authorizer, RoleResolver},
  service::DataService,
  session::SessionStore,
  thread::DisputeThread,
};

/// Landing page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overview {
  pub email:    String,
  pub is_admin: bool,
}

#[derive(Debug)]
pub enum Page {
  SignIn,
  NotFound(String),
  Home(Overview),
  Products(LoadState<Vec<Product>>),
  Invoices(LoadState<Vec<Invoice>>),
  Returns(LoadState<Vec<ReturnItem>>),
  FoodCondition {
    records:    LoadState<Vec<FoodConditionRecord>>,
    /// Whether the "add inspection" form is offered.
    can_record: bool,
  },
  Rejected(Gated<LoadState<Vec<RejectedItem>>>),
}

/// A rendered location: where the user ended up and what is shown there.
#[derive(Debug)]
pub struct Screen {
  pub path: String,
  pub page: Page,
}

pub struct Dashboard<S> {
  sessions: SessionStore<S>,
  roles:    RoleResolver<S>,
  guard:    RouteGuard<S>,
}

impl<S: DataService> Dashboard<S> {
  pub fn new(service: Arc<S>) -> Self {
    let sessions = SessionStore::new(service);
    Self {
      roles: RoleResolver::new(sessions.clone()),
      guard: RouteGuard::new(sessions.clone()),
      sessions,
    }
  }

  pub fn sessions(&self) -> &SessionStore<S> { &self.sessions }

  pub fn roles(&self) -> &RoleResolver<S> { &self.roles }

  pub fn guard(&mut self) -> &mut RouteGuard<S> { &mut self.guard }

  pub fn collection<R: Record>(&self) -> Collection<S, R> {
    Collection::new(self.sessions.clone(), self.roles.clone())
  }

  pub fn thread(&self) -> DisputeThread<S> {
    DisputeThread::new(self.sessions.clone(), self.roles.clone())
  }

  /// Fresh admin check for the current session; `false` when signed out.
  pub async fn is_admin(&self) -> bool {
    match self.sessions.current() {
      Some(session) => self.roles.authorize(&session.user_id, Role::Admin).await,
      None => false,
    }
  }

  /// Navigate to `location` and load what it shows.
  pub async fn open(&mut self, location: &str) -> Screen {
    match self.guard.navigate(location) {
      Navigation::NotFound(path) => Screen { page: Page::NotFound(path.clone()), path },
      Navigation::Render(route) | Navigation::Redirect(route) => {
        let session = self.guard.state().session().cloned();
        Screen { path: route.path().to_owned(), page: self.load(route, session).await }
      }
    }
  }

  async fn load(&self, route: Route, session: Option<Session>) -> Page {
    let Some(session) = session else {
      return Page::SignIn;
    };

    match route {
      Route::Auth => Page::SignIn,
      Route::Home => Page::Home(Overview {
        is_admin: self.roles.authorize(&session.user_id, Role::Admin).await,
        email:    session.email,
      }),
      Route::Products => Page::Products(self.collection::<Product>().list().await.into()),
      Route::Invoices => Page::Invoices(self.collection::<Invoice>().list().await.into()),
      Route::Returns => Page::Returns(self.collection::<ReturnItem>().list().await.into()),
      Route::FoodCondition => Page::FoodCondition {
        can_record: self.roles.authorize(&session.user_id, Role::Admin).await,
        records:    self.collection::<FoodConditionRecord>().list().await.into(),
      },
      Route::Rejected => {
        let gate = match route.required_role() {
          Some(role) => self.roles.authorize(&session.user_id, role).await,
          None => true,
        };
        if gate {
          Page::Rejected(Gated::Granted(
            self.collection::<RejectedItem>().list().await.into(),
          ))
        } else {
          Page::Rejected(Gated::Denied)
        }
      }
    }
  }
}
