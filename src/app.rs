use std::cell::RefCell;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

use time::Month;
use tracing::debug;

use crate::auth::{AuthError, AuthProvider, Identity};
use crate::cache::{CacheError, LocalCache};
use crate::calendar::{
    month_view, select_date, DayContext, InvalidSelection, LogDate, MonthView, ParseDateError,
};
use crate::config::ConfigError;
use crate::controller::{Controller, ControllerError};
use crate::gate::{GateError, GateState, OnboardingGate, Route};
use crate::locks::KeyLocks;
use crate::records::{Profile, Record, RecordKey, ValidationError};
use crate::remote::RemoteStore;
use crate::session::{SessionManager, Subscription};
use crate::synchronizer::RecordSynchronizer;

/// Navigation shell: follows the session, keeps the onboarding gate current
/// and hands out screen controllers.
pub struct App<'a> {
    session: SessionManager<'a>,
    sync: RecordSynchronizer<'a>,
    cache: &'a dyn LocalCache,
    gate: RefCell<OnboardingGate>,
    applied_user: RefCell<Option<String>>,
    events: Rc<RefCell<VecDeque<Option<Identity>>>>,
    subscription: Option<Subscription>,
}

impl<'a> App<'a> {
    /// Starts the shell. The restored session is replayed right away, so a
    /// signed-in user gets a fresh profile check.
    pub fn launch(
        auth: &'a dyn AuthProvider,
        remote: &'a dyn RemoteStore,
        cache: &'a dyn LocalCache,
        locks: Option<KeyLocks>,
    ) -> Result<Self, AppError> {
        let session = SessionManager::new(auth);
        let mut sync = RecordSynchronizer::new(remote, cache);
        if let Some(locks) = locks {
            sync = sync.with_locks(locks);
        }

        let events = Rc::new(RefCell::new(VecDeque::new()));
        let sink = Rc::clone(&events);
        let subscription = session.subscribe(move |identity: Option<&Identity>| {
            sink.borrow_mut().push_back(identity.cloned());
        });

        let app = Self {
            session,
            sync,
            cache,
            gate: RefCell::new(OnboardingGate::default()),
            applied_user: RefCell::new(None),
            events,
            subscription: Some(subscription),
        };
        app.pump()?;
        Ok(app)
    }

    /// Applies queued session transitions in order. The cache belongs to one
    /// user: it is cleared on sign-out and when another user takes over.
    fn pump(&self) -> Result<(), AppError> {
        loop {
            let next = self.events.borrow_mut().pop_front();
            let Some(event) = next else {
                return Ok(());
            };
            match event {
                Some(identity) => {
                    let previous = self.applied_user.replace(Some(identity.user_id.clone()));
                    if previous.is_some_and(|user_id| user_id != identity.user_id) {
                        self.cache.clear()?;
                        debug!(user_id = %identity.user_id, "cache cleared after user switch");
                    }
                    self.gate.borrow_mut().evaluate(&identity, &self.sync);
                }
                None => {
                    self.applied_user.replace(None);
                    self.cache.clear()?;
                    self.gate.borrow_mut().signed_out();
                    debug!("cache cleared after sign-out");
                }
            }
        }
    }

    pub fn current_user(&self) -> Option<Identity> {
        self.session.current()
    }

    pub fn gate_state(&self) -> GateState {
        self.gate.borrow().state().clone()
    }

    pub fn route(&self) -> Route {
        self.gate.borrow().route()
    }

    pub fn reachable(&self) -> &'static [Route] {
        self.gate.borrow().reachable()
    }

    pub fn register(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        self.gate.borrow().require_signed_out()?;
        let identity = self.session.register(email, password)?;
        self.pump()?;
        Ok(identity)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        self.gate.borrow().require_signed_out()?;
        let identity = self.session.sign_in(email, password)?;
        self.pump()?;
        Ok(identity)
    }

    pub fn sign_out(&self) -> Result<(), AppError> {
        self.session.sign_out()?;
        self.pump()
    }

    pub fn synchronizer(&self) -> &RecordSynchronizer<'a> {
        &self.sync
    }

    /// Profile screen. Reachable before the profile is complete.
    pub fn profile(&self) -> Result<Controller<'_, Profile>, AppError> {
        let user_id = self.gate.borrow().require_signed_in()?.to_string();
        Ok(Controller::open(&self.sync, RecordKey::profile(&user_id)))
    }

    pub fn save_profile(
        &self,
        screen: &Controller<'_, Profile>,
        profile: Profile,
    ) -> Result<(), AppError> {
        screen.set(profile)?;
        self.gate
            .borrow_mut()
            .profile_saved(screen.key().user_id());
        Ok(())
    }

    pub fn month(&self, year: i32, month: Month, today: LogDate) -> Result<MonthView, AppError> {
        self.gate.borrow().require_complete()?;
        Ok(month_view(year, month, today)?)
    }

    pub fn select_day(&self, date: LogDate, today: LogDate) -> Result<DayContext, AppError> {
        let gate = self.gate.borrow();
        let user_id = gate.require_complete()?;
        Ok(select_date(date, today, user_id)?)
    }

    /// Editable screen for one day. A screen that fell back to a cached
    /// copy gets one more read before it is handed out.
    pub fn open<R: Record>(&self, day: &DayContext) -> Controller<'_, R> {
        let screen = Controller::open_day(&self.sync, day);
        if screen.is_stale() {
            if let Err(err) = screen.reload() {
                debug!(category = %R::CATEGORY, error = %err, "retry failed; edits stay blocked");
            }
        }
        screen
    }

    /// Read-only screen for listings and summaries.
    pub fn view<R: Record>(&self, day: &DayContext) -> Controller<'_, R> {
        let screen = Controller::open_day(&self.sync, day);
        screen.close();
        screen
    }

    /// Detaches from the session. Later transitions are no longer applied.
    pub fn shutdown(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

#[derive(Debug)]
pub enum AppError {
    Io(std::io::Error),
    Db(rusqlite::Error),
    Config(ConfigError),
    Cache(CacheError),
    Auth(AuthError),
    Gate(GateError),
    Controller(ControllerError),
    Validation(ValidationError),
    Date(ParseDateError),
    Selection(InvalidSelection),
    InvalidArgument(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Io(err) => write!(f, "I/O error: {}", err),
            AppError::Db(err) => write!(f, "database error: {}", err),
            AppError::Config(err) => write!(f, "{}", err),
            AppError::Cache(err) => write!(f, "{}", err),
            AppError::Auth(err) => write!(f, "{}", err),
            AppError::Gate(err) => write!(f, "{}", err),
            AppError::Controller(err) => write!(f, "{}", err),
            AppError::Validation(err) => write!(f, "{}", err),
            AppError::Date(err) => write!(f, "{}", err),
            AppError::Selection(err) => write!(f, "{}", err),
            AppError::InvalidArgument(message) => write!(f, "{}", message),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Io(err) => Some(err),
            AppError::Db(err) => Some(err),
            AppError::Config(err) => Some(err),
            AppError::Cache(err) => Some(err),
            AppError::Auth(err) => Some(err),
            AppError::Gate(err) => Some(err),
            AppError::Controller(err) => Some(err),
            AppError::Validation(err) => Some(err),
            AppError::Date(err) => Some(err),
            AppError::Selection(err) => Some(err),
            AppError::InvalidArgument(_) => None,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        AppError::Io(value)
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        AppError::Db(value)
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        AppError::Config(value)
    }
}

impl From<CacheError> for AppError {
    fn from(value: CacheError) -> Self {
        AppError::Cache(value)
    }
}

impl From<AuthError> for AppError {
    fn from(value: AuthError) -> Self {
        AppError::Auth(value)
    }
}

impl From<GateError> for AppError {
    fn from(value: GateError) -> Self {
        AppError::Gate(value)
    }
}

impl From<ControllerError> for AppError {
    fn from(value: ControllerError) -> Self {
        AppError::Controller(value)
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        AppError::Validation(value)
    }
}

impl From<ParseDateError> for AppError {
    fn from(value: ParseDateError) -> Self {
        AppError::Date(value)
    }
}

impl From<InvalidSelection> for AppError {
    fn from(value: InvalidSelection) -> Self {
        AppError::Selection(value)
    }
}

#[cfg(test)]
mod tests;
