use std::cell::{Cell, RefCell};

use serde_json::{json, Value};

use super::{Controller, ControllerError};
use crate::calendar::{select_date, LogDate};
use crate::records::{
    CardioLog, Meal, MealLog, Profile, RecordKey, WaterEntry, WaterLog, WorkoutLog,
};
use crate::synchronizer::{RecordSynchronizer, SaveError};
use crate::remote::{RecordPath, RemoteError, RemoteStore};
use crate::testing::{MemoryCache, MemoryRemote};

fn day() -> LogDate {
    "2024-03-01".parse().expect("test date should parse")
}

fn water_key() -> RecordKey {
    RecordKey::daily(crate::records::Category::Water, "u1", day())
}

fn oats() -> Meal {
    Meal {
        name: "Oats".to_string(),
        calories: 300.0,
        protein: 10.0,
        carbs: 50.0,
        fats: 5.0,
    }
}

#[test]
fn open_day_loads_the_day_record() {
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let sync = RecordSynchronizer::new(&remote, &cache);
    sync.save(
        "u1",
        day(),
        &WaterLog {
            entries: vec![WaterEntry { amount: 250.0 }],
        },
    )
    .expect("seed");

    let ctx = select_date(day(), day(), "u1").expect("today");
    let water = Controller::<WaterLog>::open_day(&sync, &ctx);
    assert_eq!(water.entries().len(), 1);
    assert!(water.warning().is_none());

    let workout = Controller::<WorkoutLog>::open_day(&sync, &ctx);
    assert_eq!(*workout.state(), WorkoutLog::default());
    assert_eq!(workout.summary().sets, 0);
}

#[test]
fn list_mutations_save_the_full_record() {
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let sync = RecordSynchronizer::new(&remote, &cache);
    let water = Controller::<WaterLog>::open(&sync, water_key());

    water.add(WaterEntry { amount: 250.0 }).expect("add");
    water.add(WaterEntry { amount: 500.0 }).expect("add");
    assert_eq!(water.total_ml(), 750.0);
    assert_eq!(remote.writes(), 2);

    water
        .replace(0, WaterEntry { amount: 300.0 })
        .expect("replace");
    let removed = water.remove(1).expect("remove");
    assert_eq!(removed.amount, 500.0);
    assert_eq!(water.total_ml(), 300.0);

    let reloaded = sync.load::<WaterLog>("u1", day()).expect("reload");
    assert_eq!(reloaded, *water.state());
}

#[test]
fn out_of_range_index_is_rejected_without_io() {
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let sync = RecordSynchronizer::new(&remote, &cache);
    let meals = Controller::<MealLog>::open(
        &sync,
        RecordKey::daily(crate::records::Category::Meal, "u1", day()),
    );
    let writes_before = remote.writes();

    let err = meals.replace(0, oats()).expect_err("empty list");
    assert!(matches!(
        err,
        ControllerError::IndexOutOfRange { index: 0, len: 0 }
    ));
    assert!(matches!(
        meals.remove(3),
        Err(ControllerError::IndexOutOfRange { index: 3, len: 0 })
    ));
    assert_eq!(remote.writes(), writes_before);
}

#[test]
fn failed_save_reverts_state() {
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let sync = RecordSynchronizer::new(&remote, &cache);
    let meals = Controller::<MealLog>::open(
        &sync,
        RecordKey::daily(crate::records::Category::Meal, "u1", day()),
    );
    meals.add(oats()).expect("first add");

    remote.fail_writes(true);
    let err = meals.add(oats()).expect_err("write fails");
    assert!(matches!(
        err,
        ControllerError::Save(SaveError::Persistence(_))
    ));
    assert_eq!(meals.entries().len(), 1);
    assert!(!meals.pending.get());

    remote.fail_writes(false);
    let err = meals
        .add(Meal {
            name: String::new(),
            ..oats()
        })
        .expect_err("blank name");
    assert!(matches!(err, ControllerError::Save(SaveError::Validation(_))));
    assert_eq!(meals.entries().len(), 1);
    assert_eq!(meals.totals().calories, 300.0);
}

#[test]
fn closed_controller_never_reaches_the_network() {
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let sync = RecordSynchronizer::new(&remote, &cache);
    let cardio = Controller::<CardioLog>::open(
        &sync,
        RecordKey::daily(crate::records::Category::Cardio, "u1", day()),
    );
    let calls_before = remote.calls();
    cardio.close();
    assert!(!cardio.active.get());

    let err = cardio
        .set(CardioLog {
            distance: "5".to_string(),
            duration: "30".to_string(),
            calories: "300".to_string(),
        })
        .expect_err("closed");
    assert!(matches!(err, ControllerError::Closed));
    assert_eq!(remote.calls(), calls_before);
}

#[test]
fn read_failure_falls_back_to_cached_mirror_with_warning() {
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let sync = RecordSynchronizer::new(&remote, &cache);
    let seeded = CardioLog {
        distance: "5".to_string(),
        duration: "30".to_string(),
        calories: "300".to_string(),
    };
    sync.save("u1", day(), &seeded).expect("seed");
    remote.fail_reads(true);

    let key = RecordKey::daily(crate::records::Category::Cardio, "u1", day());
    let cardio = Controller::<CardioLog>::open(&sync, key);
    assert_eq!(*cardio.state(), seeded);
    assert_eq!(cardio.pace_min_per_km(), Some(6.0));
    assert!(cardio
        .warning()
        .expect("warning should be set")
        .contains("last synced copy"));

    let water = Controller::<WaterLog>::open(&sync, water_key());
    assert_eq!(*water.state(), WaterLog::default());
    assert!(water
        .warning()
        .expect("warning should be set")
        .contains("empty log"));
}

#[test]
fn profile_controller_sets_whole_profile() {
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let sync = RecordSynchronizer::new(&remote, &cache);
    let profile = Controller::<Profile>::open(&sync, RecordKey::profile("u1"));
    assert_eq!(*profile.state(), Profile::default());

    let updated = Profile {
        name: "Ana".to_string(),
        age: 31,
        weight: 61.0,
        height: 165.0,
    };
    profile.set(updated.clone()).expect("save profile");
    assert_eq!(sync.load_profile("u1").expect("load"), Some(updated));
}

#[test]
fn fallback_state_refuses_list_edits_until_reloaded() {
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let sync = RecordSynchronizer::new(&remote, &cache);
    let stored = json!([{ "amount": 250.0 }, { "amount": 500.0 }]);
    remote.insert("users/u1/logs/water/2024-03-01", stored.clone());
    remote.fail_reads(true);

    let water = Controller::<WaterLog>::open(&sync, water_key());
    assert!(water.is_stale());
    assert_eq!(water.total_ml(), 0.0);
    remote.fail_reads(false);
    let writes_before = remote.writes();

    let err = water
        .add(WaterEntry { amount: 100.0 })
        .expect_err("fallback state is not editable");
    assert!(matches!(err, ControllerError::Stale));
    assert!(matches!(water.remove(0), Err(ControllerError::Stale)));
    assert!(matches!(
        water.replace(0, WaterEntry { amount: 1.0 }),
        Err(ControllerError::Stale)
    ));
    assert_eq!(remote.writes(), writes_before);
    assert_eq!(remote.get("users/u1/logs/water/2024-03-01"), Some(stored));

    water.reload().expect("store is reachable again");
    assert!(!water.is_stale());
    assert!(water.warning().is_none());
    water.add(WaterEntry { amount: 100.0 }).expect("add after reload");
    assert_eq!(water.total_ml(), 850.0);
    assert_eq!(
        remote
            .get("users/u1/logs/water/2024-03-01")
            .and_then(|value| value.as_array().map(Vec::len)),
        Some(3)
    );
}

struct CallbackRemote<'a> {
    inner: MemoryRemote,
    on_write: Cell<Option<&'a dyn Fn()>>,
}

impl RemoteStore for CallbackRemote<'_> {
    fn read(&self, path: &RecordPath) -> Result<Option<Value>, RemoteError> {
        self.inner.read(path)
    }

    fn write(&self, path: &RecordPath, value: &Value) -> Result<(), RemoteError> {
        if let Some(callback) = self.on_write.take() {
            callback();
        }
        self.inner.write(path, value)
    }
}

#[test]
fn edit_issued_during_a_save_is_rejected_as_busy() {
    let remote = CallbackRemote {
        inner: MemoryRemote::default(),
        on_write: Cell::new(None),
    };
    let cache = MemoryCache::default();
    let sync = RecordSynchronizer::new(&remote, &cache);
    let water = Controller::<WaterLog>::open(&sync, water_key());
    let nested = RefCell::new(None);
    let during_save: &dyn Fn() = &|| {
        *nested.borrow_mut() = Some(water.add(WaterEntry { amount: 100.0 }));
    };
    remote.on_write.set(Some(during_save));

    water.add(WaterEntry { amount: 250.0 }).expect("outer add");

    assert!(matches!(
        nested.borrow().as_ref(),
        Some(Err(ControllerError::Busy))
    ));
    assert_eq!(remote.inner.writes(), 1);
    assert_eq!(water.total_ml(), 250.0);
    assert!(!water.pending.get());
}
