use std::error::Error;
use std::fmt;

use serde::Serialize;
use tracing::{info, warn};

use crate::auth::Identity;
use crate::records::RecordKey;
use crate::synchronizer::RecordSynchronizer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GateState {
    Unauthenticated,
    AuthenticatedIncompleteProfile { user_id: String },
    AuthenticatedComplete { user_id: String },
}

impl GateState {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            GateState::Unauthenticated => None,
            GateState::AuthenticatedIncompleteProfile { user_id }
            | GateState::AuthenticatedComplete { user_id } => Some(user_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Login,
    Register,
    CompleteProfile,
    Calendar,
    DayDetails,
}

impl Route {
    pub fn label(self) -> &'static str {
        match self {
            Route::Login => "login",
            Route::Register => "register",
            Route::CompleteProfile => "complete-profile",
            Route::Calendar => "calendar",
            Route::DayDetails => "day-details",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateError {
    NotSignedIn,
    AlreadySignedIn,
    ProfileIncomplete,
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateError::NotSignedIn => {
                write!(f, "not signed in; run `fitlog login` or `fitlog register`")
            }
            GateError::AlreadySignedIn => {
                write!(f, "already signed in; run `fitlog logout` first")
            }
            GateError::ProfileIncomplete => write!(
                f,
                "complete your profile first with `fitlog profile set`"
            ),
        }
    }
}

impl Error for GateError {}

/// Decides which screens a user may reach: sign-in, profile completion, or
/// the calendar and its day screens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnboardingGate {
    state: GateState,
}

impl Default for OnboardingGate {
    fn default() -> Self {
        Self {
            state: GateState::Unauthenticated,
        }
    }
}

impl OnboardingGate {
    pub fn state(&self) -> &GateState {
        &self.state
    }

    /// Runs once per sign-in event. Drops the mirrored profile, then asks
    /// the remote store whether this user has one.
    pub fn evaluate(&mut self, identity: &Identity, sync: &RecordSynchronizer<'_>) -> &GateState {
        let user_id = identity.user_id.clone();
        if let Err(err) = sync.evict(&RecordKey::profile(&user_id)) {
            warn!(user_id = %user_id, error = %err, "failed to drop mirrored profile");
        }
        self.state = match sync.load_profile(&user_id) {
            Ok(Some(_)) => GateState::AuthenticatedComplete { user_id },
            Ok(None) => GateState::AuthenticatedIncompleteProfile { user_id },
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "profile check failed; treating as incomplete");
                GateState::AuthenticatedIncompleteProfile { user_id }
            }
        };
        info!(state = ?self.state, "onboarding gate evaluated");
        &self.state
    }

    pub fn profile_saved(&mut self, user_id: &str) {
        if self.state.user_id() == Some(user_id) {
            self.state = GateState::AuthenticatedComplete {
                user_id: user_id.to_string(),
            };
        }
    }

    pub fn signed_out(&mut self) {
        self.state = GateState::Unauthenticated;
    }

    pub fn route(&self) -> Route {
        match self.state {
            GateState::Unauthenticated => Route::Login,
            GateState::AuthenticatedIncompleteProfile { .. } => Route::CompleteProfile,
            GateState::AuthenticatedComplete { .. } => Route::Calendar,
        }
    }

    pub fn reachable(&self) -> &'static [Route] {
        match self.state {
            GateState::Unauthenticated => &[Route::Login, Route::Register],
            GateState::AuthenticatedIncompleteProfile { .. } => &[Route::CompleteProfile],
            GateState::AuthenticatedComplete { .. } => &[Route::Calendar, Route::DayDetails],
        }
    }

    pub fn require_signed_in(&self) -> Result<&str, GateError> {
        self.state.user_id().ok_or(GateError::NotSignedIn)
    }

    /// Login and registration are only reachable while signed out.
    pub fn require_signed_out(&self) -> Result<(), GateError> {
        match self.state {
            GateState::Unauthenticated => Ok(()),
            _ => Err(GateError::AlreadySignedIn),
        }
    }

    /// User id of a signed-in user whose profile is complete.
    pub fn require_complete(&self) -> Result<&str, GateError> {
        match &self.state {
            GateState::Unauthenticated => Err(GateError::NotSignedIn),
            GateState::AuthenticatedIncompleteProfile { .. } => Err(GateError::ProfileIncomplete),
            GateState::AuthenticatedComplete { user_id } => Ok(user_id),
        }
    }
}
