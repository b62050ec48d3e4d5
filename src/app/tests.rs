use super::{App, AppError};
use crate::auth::AuthProvider;
use crate::cache::LocalCache;
use crate::calendar::LogDate;
use crate::gate::{GateError, GateState, Route};
use crate::records::{Profile, Record, WaterEntry, WaterLog};
use crate::testing::{MemoryAuth, MemoryCache, MemoryRemote};

fn date(raw: &str) -> LogDate {
    raw.parse().expect("test date should parse")
}

fn ana_profile() -> Profile {
    Profile {
        name: "Ana".to_string(),
        age: 30,
        weight: 60.0,
        height: 165.0,
    }
}

#[test]
fn launch_without_session_routes_to_login() {
    let auth = MemoryAuth::default();
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let app = App::launch(&auth, &remote, &cache, None).expect("launch");

    assert_eq!(app.route(), Route::Login);
    assert!(app.current_user().is_none());
    assert!(matches!(
        app.select_day(date("2024-03-01"), date("2024-03-01")),
        Err(AppError::Gate(GateError::NotSignedIn))
    ));
}

#[test]
fn onboarding_moves_from_profile_completion_to_calendar() {
    let auth = MemoryAuth::default();
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let app = App::launch(&auth, &remote, &cache, None).expect("launch");

    let identity = app
        .register("ana@example.com", "secret1")
        .expect("register");
    assert_eq!(
        app.gate_state(),
        GateState::AuthenticatedIncompleteProfile {
            user_id: identity.user_id.clone()
        }
    );
    assert!(matches!(
        app.select_day(date("2024-03-01"), date("2024-03-01")),
        Err(AppError::Gate(GateError::ProfileIncomplete))
    ));

    let screen = app.profile().expect("profile screen");
    app.save_profile(&screen, ana_profile()).expect("save profile");
    assert_eq!(app.route(), Route::Calendar);
    assert!(app
        .month(2024, time::Month::March, date("2024-03-15"))
        .is_ok());
}

#[test]
fn returning_user_with_profile_lands_on_calendar() {
    let auth = MemoryAuth::default();
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    {
        let app = App::launch(&auth, &remote, &cache, None).expect("first launch");
        app.register("ana@example.com", "secret1").expect("register");
        let screen = app.profile().expect("profile screen");
        app.save_profile(&screen, ana_profile()).expect("save");
    }

    let app = App::launch(&auth, &remote, &cache, None).expect("relaunch");
    assert_eq!(app.route(), Route::Calendar);
}

#[test]
fn future_dates_are_rejected_after_onboarding() {
    let auth = MemoryAuth::default();
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let app = App::launch(&auth, &remote, &cache, None).expect("launch");
    app.register("ana@example.com", "secret1").expect("register");
    let screen = app.profile().expect("profile screen");
    app.save_profile(&screen, ana_profile()).expect("save");

    let today = date("2024-03-01");
    assert!(matches!(
        app.select_day(date("2024-03-02"), today),
        Err(AppError::Selection(_))
    ));
    let day = app.select_day(today, today).expect("today is selectable");
    assert_eq!(day.user_id(), screen.key().user_id());
}

#[test]
fn sign_out_clears_cache_and_next_user_sees_no_stale_data() {
    let auth = MemoryAuth::default();
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let app = App::launch(&auth, &remote, &cache, None).expect("launch");
    let today = date("2024-03-01");

    app.register("ana@example.com", "secret1").expect("register ana");
    let screen = app.profile().expect("profile screen");
    app.save_profile(&screen, ana_profile()).expect("save");
    let day = app.select_day(today, today).expect("select");
    let water = app.open::<WaterLog>(&day);
    water.add(WaterEntry { amount: 250.0 }).expect("add water");
    drop(water);
    drop(screen);
    assert!(!cache.is_empty());

    app.sign_out().expect("sign out");
    assert!(cache.is_empty());
    assert_eq!(app.route(), Route::Login);

    app.register("bob@example.com", "secret2").expect("register bob");
    assert_eq!(app.route(), Route::CompleteProfile);
    assert!(cache.get("userProfile").expect("cache get").is_none());
    assert!(cache.is_empty());
}

#[test]
fn shutdown_stops_following_the_session() {
    let auth = MemoryAuth::default();
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let mut app = App::launch(&auth, &remote, &cache, None).expect("launch");
    app.register("ana@example.com", "secret1").expect("register");
    let clears_before = cache.clears();

    app.shutdown();
    app.sign_out().expect("sign out");
    assert_eq!(cache.clears(), clears_before);
}

#[test]
fn login_and_register_are_refused_while_signed_in() {
    let auth = MemoryAuth::default();
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    let app = App::launch(&auth, &remote, &cache, None).expect("launch");
    let today = date("2024-03-01");

    let ana = app.register("ana@example.com", "secret1").expect("register ana");
    let screen = app.profile().expect("profile screen");
    app.save_profile(&screen, ana_profile()).expect("save");
    let day = app.select_day(today, today).expect("select");
    app.open::<WaterLog>(&day)
        .add(WaterEntry { amount: 250.0 })
        .expect("add water");
    let keys_before = cache.keys();

    assert!(matches!(
        app.register("bob@example.com", "secret2"),
        Err(AppError::Gate(GateError::AlreadySignedIn))
    ));
    assert!(matches!(
        app.sign_in("ana@example.com", "secret1"),
        Err(AppError::Gate(GateError::AlreadySignedIn))
    ));
    assert_eq!(app.current_user().map(|user| user.user_id), Some(ana.user_id));
    assert_eq!(cache.keys(), keys_before);
    assert_eq!(app.route(), Route::Calendar);
}

#[test]
fn switching_users_without_sign_out_clears_the_previous_cache() {
    let auth = MemoryAuth::default();
    let remote = MemoryRemote::default();
    let cache = MemoryCache::default();
    auth.register("bob@example.com", "secret2").expect("register bob");
    auth.sign_out().expect("bob signs out");

    let app = App::launch(&auth, &remote, &cache, None).expect("launch");
    let today = date("2024-03-01");
    let ana = app.register("ana@example.com", "secret1").expect("register ana");
    let screen = app.profile().expect("profile screen");
    app.save_profile(&screen, ana_profile()).expect("save");
    let day = app.select_day(today, today).expect("select");
    app.open::<WaterLog>(&day)
        .add(WaterEntry { amount: 250.0 })
        .expect("add water");
    let water_key = WaterLog::key(&ana.user_id, today).cache_key();
    assert!(cache.keys().contains(&water_key));
    let clears_before = cache.clears();

    let bob = app
        .session
        .sign_in("bob@example.com", "secret2")
        .expect("bob signs in");
    app.pump().expect("apply switch");

    assert_eq!(cache.clears(), clears_before + 1);
    assert!(!cache.keys().contains(&water_key));
    assert!(cache.get("userProfile").expect("cache get").is_none());
    assert_eq!(
        app.gate_state(),
        GateState::AuthenticatedIncompleteProfile {
            user_id: bob.user_id
        }
    );
}
