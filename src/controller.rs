use std::cell::{Cell, Ref, RefCell};
use std::error::Error;
use std::fmt;

use tracing::{debug, warn};

use crate::calendar::DayContext;
use crate::records::{
    CardioLog, EntryList, MacroTotals, MealLog, Record, RecordKey, WaterLog, WorkoutLog,
    WorkoutSummary,
};
use crate::synchronizer::{ReadError, RecordSynchronizer, SaveError};

mod forms;

pub use forms::{CardioForm, ExerciseForm, MealForm, ProfileForm, WaterForm};

#[derive(Debug)]
pub enum ControllerError {
    Closed,
    /// A save is still running for this screen. Only reachable when a
    /// store calls back into the screen while it writes.
    Busy,
    /// The record failed to load and the screen shows a fallback copy.
    Stale,
    IndexOutOfRange { index: usize, len: usize },
    Save(SaveError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::Closed => write!(f, "screen is closed"),
            ControllerError::Busy => write!(f, "a save is already in progress"),
            ControllerError::Stale => write!(
                f,
                "the stored log could not be loaded; retry once the record store is reachable"
            ),
            ControllerError::IndexOutOfRange { index, len } => write!(
                f,
                "entry {} does not exist ({} entr{} logged)",
                index + 1,
                len,
                if *len == 1 { "y" } else { "ies" }
            ),
            ControllerError::Save(err) => write!(f, "{}", err),
        }
    }
}

impl Error for ControllerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ControllerError::Save(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SaveError> for ControllerError {
    fn from(value: SaveError) -> Self {
        ControllerError::Save(value)
    }
}

/// Editable state of one record shown on one screen.
///
/// Every mutation builds the complete next record and saves it. A failed
/// save leaves the previous state in place.
///
/// When the first read fails the screen shows the cached mirror (or an empty
/// record) and list edits are refused until [`Controller::reload`] succeeds.
pub struct Controller<'s, R: Record> {
    sync: &'s RecordSynchronizer<'s>,
    key: RecordKey,
    state: RefCell<R>,
    warning: RefCell<Option<String>>,
    stale: Cell<bool>,
    pending: Cell<bool>,
    active: Cell<bool>,
}

impl<'s, R: Record> Controller<'s, R> {
    pub fn open(sync: &'s RecordSynchronizer<'s>, key: RecordKey) -> Self {
        let screen = Self {
            sync,
            key,
            state: RefCell::new(R::default()),
            warning: RefCell::new(None),
            stale: Cell::new(false),
            pending: Cell::new(false),
            active: Cell::new(true),
        };
        if let Err(err) = screen.reload() {
            warn!(category = %screen.key.category(), error = %err, "falling back to cached record");
            let warning = match screen.sync.cached_record::<R>(&screen.key) {
                Some(record) => {
                    *screen.state.borrow_mut() = record;
                    format!("{err}; showing last synced copy")
                }
                None => format!("{err}; showing an empty log"),
            };
            *screen.warning.borrow_mut() = Some(warning);
            screen.stale.set(true);
        }
        screen
    }

    pub fn open_day(sync: &'s RecordSynchronizer<'s>, day: &DayContext) -> Self {
        Self::open(sync, R::key(day.user_id(), day.date()))
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    pub fn state(&self) -> Ref<'_, R> {
        self.state.borrow()
    }

    pub fn warning(&self) -> Option<String> {
        self.warning.borrow().clone()
    }

    pub fn is_stale(&self) -> bool {
        self.stale.get()
    }

    /// Reads the record again. On success the fallback state and its
    /// warning are replaced; on failure the screen is left as it was.
    pub fn reload(&self) -> Result<(), ReadError> {
        let record = self.sync.read_record::<R>(&self.key)?;
        *self.state.borrow_mut() = record.unwrap_or_default();
        *self.warning.borrow_mut() = None;
        self.stale.set(false);
        Ok(())
    }

    pub fn close(&self) {
        self.active.set(false);
    }

    /// Replaces the whole record.
    pub fn set(&self, record: R) -> Result<(), ControllerError> {
        self.commit(record)
    }

    fn commit(&self, next: R) -> Result<(), ControllerError> {
        if !self.active.get() {
            return Err(ControllerError::Closed);
        }
        if self.pending.replace(true) {
            return Err(ControllerError::Busy);
        }
        let result = self.sync.write_record(&self.key, &next);
        self.pending.set(false);
        result?;
        if !self.active.get() {
            debug!(category = %self.key.category(), "screen closed during save");
            return Ok(());
        }
        *self.state.borrow_mut() = next;
        Ok(())
    }
}

impl<'s, R: EntryList> Controller<'s, R> {
    pub fn entries(&self) -> Vec<R::Entry> {
        self.state.borrow().entries().to_vec()
    }

    pub fn add(&self, entry: R::Entry) -> Result<(), ControllerError> {
        self.require_loaded()?;
        let mut next = self.state.borrow().clone();
        next.entries_mut().push(entry);
        self.commit(next)
    }

    pub fn replace(&self, index: usize, entry: R::Entry) -> Result<(), ControllerError> {
        self.require_loaded()?;
        let mut next = self.state.borrow().clone();
        let len = next.entries().len();
        let slot = next
            .entries_mut()
            .get_mut(index)
            .ok_or(ControllerError::IndexOutOfRange { index, len })?;
        *slot = entry;
        self.commit(next)
    }

    pub fn remove(&self, index: usize) -> Result<R::Entry, ControllerError> {
        self.require_loaded()?;
        let mut next = self.state.borrow().clone();
        let len = next.entries().len();
        if index >= len {
            return Err(ControllerError::IndexOutOfRange { index, len });
        }
        let removed = next.entries_mut().remove(index);
        self.commit(next)?;
        Ok(removed)
    }

    // Saving a list built on a fallback copy would overwrite the stored one.
    fn require_loaded(&self) -> Result<(), ControllerError> {
        if self.stale.get() {
            return Err(ControllerError::Stale);
        }
        Ok(())
    }
}

impl Controller<'_, WaterLog> {
    pub fn total_ml(&self) -> f64 {
        self.state.borrow().total_ml()
    }
}

impl Controller<'_, MealLog> {
    pub fn totals(&self) -> MacroTotals {
        self.state.borrow().totals()
    }
}

impl Controller<'_, WorkoutLog> {
    pub fn summary(&self) -> WorkoutSummary {
        self.state.borrow().summary()
    }
}

impl Controller<'_, CardioLog> {
    pub fn pace_min_per_km(&self) -> Option<f64> {
        self.state.borrow().pace_min_per_km()
    }
}

#[cfg(test)]
mod tests;
