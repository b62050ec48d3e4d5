mod app;
mod auth;
mod backend;
mod cache;
mod calendar;
mod cli;
mod config;
mod controller;
mod db;
mod gate;
mod init;
mod locks;
mod logging;
mod records;
mod remote;
mod session;
mod synchronizer;
#[cfg(test)]
mod testing;
mod ui;

use serde_json::json;

use crate::app::{App, AppError};
use crate::calendar::{parse_month, today_local, DayContext, LogDate};
use crate::cli::{
    AppCommands, CardioSubcommands, Commands, DateArg, MealSubcommands, ProfileSubcommands, WaterSubcommands,
    WorkoutSubcommands,
};
use crate::controller::{
    CardioForm, Controller, ControllerError, ExerciseForm, MealForm, ProfileForm, WaterForm,
};
use crate::records::{CardioLog, MealLog, Record, WaterLog, WorkoutLog};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), AppError> {
    use clap::Parser;

    let cli = cli::Cli::parse();
    let settings = config::Settings::load(&cli.home, cli.remote.as_deref(), cli.db.as_deref())?;
    logging::init(&settings.log_filter);

    let command = match cli.command {
        Commands::Init => {
            init::init_home(&settings)?;
            println!("fitlog init completed");
            return Ok(());
        }
        Commands::App(command) => command,
    };

    let backend = backend::Backend::open(&settings);
    let cache = cache::SqliteCache::open(&settings.cache_path)?;
    let locks = locks::KeyLocks::new(settings.lock_dir(), settings.lock_timeout);
    let mut app = App::launch(&backend, &backend, &cache, Some(locks))?;
    let result = dispatch(&app, command);
    app.shutdown();
    backend.close();
    result
}

fn dispatch(app: &App<'_>, command: AppCommands) -> Result<(), AppError> {
    match command {
        AppCommands::Register(args) => {
            let identity = app.register(&args.email, &args.password)?;
            println!("registered {} ({})", identity.email, identity.user_id);
            print_next_step(app);
        }
        AppCommands::Login(args) => {
            let identity = app.sign_in(&args.email, &args.password)?;
            println!("signed in as {}", identity.email);
            print_next_step(app);
        }
        AppCommands::Logout => {
            app.sign_out()?;
            println!("signed out; local cache cleared");
        }
        AppCommands::Status(args) => {
            let user = app.current_user();
            if args.json {
                print_json(&json!({
                    "user": user,
                    "gate": app.gate_state(),
                    "route": app.route(),
                    "reachable": app.reachable(),
                }));
            } else {
                ui::print_status(
                    user.as_ref(),
                    &app.gate_state(),
                    app.route(),
                    app.reachable(),
                );
            }
        }
        AppCommands::Profile(args) => run_profile(app, args.command)?,
        AppCommands::Calendar(args) => {
            let today = today_local();
            let (year, month) = match args.month.as_deref() {
                Some(raw) => parse_month(raw)?,
                None => (today.date().year(), today.date().month()),
            };
            let view = app.month(year, month, today)?;
            if args.json {
                print_json(&view);
            } else {
                ui::print_month(&view);
            }
        }
        AppCommands::Day(args) => {
            let date = args.date.parse::<LogDate>()?;
            let day = app.select_day(date, today_local())?;
            let summary = day_summary(app, &day);
            if args.json {
                print_json(&summary);
            } else {
                ui::print_day(&day, &summary);
            }
        }
        AppCommands::Workout(args) => run_workout(app, args.command)?,
        AppCommands::Cardio(args) => run_cardio(app, args.command)?,
        AppCommands::Meal(args) => run_meal(app, args.command)?,
        AppCommands::Water(args) => run_water(app, args.command)?,
    }

    Ok(())
}

fn run_profile(app: &App<'_>, command: ProfileSubcommands) -> Result<(), AppError> {
    let screen = app.profile()?;
    warn_if_stale(&screen);
    match command {
        ProfileSubcommands::Show(args) => {
            let profile = screen.state().clone();
            if args.json {
                print_json(&profile);
            } else if profile.validate().is_err() {
                println!("no profile yet; run `fitlog profile set`");
            } else {
                ui::print_profile(&profile);
            }
        }
        ProfileSubcommands::Set(args) => {
            let current = screen.state().clone();
            let form = ProfileForm {
                name: args.name.unwrap_or(current.name),
                age: args
                    .age
                    .unwrap_or_else(|| prefill(f64::from(current.age))),
                weight: args.weight.unwrap_or_else(|| prefill(current.weight)),
                height: args.height.unwrap_or_else(|| prefill(current.height)),
            };
            let profile = form.parse()?;
            app.save_profile(&screen, profile)?;
            println!("profile saved");
        }
    }
    Ok(())
}

fn run_workout(app: &App<'_>, command: WorkoutSubcommands) -> Result<(), AppError> {
    match command {
        WorkoutSubcommands::Ls(args) => {
            let day = resolve_day(app, &args.date)?;
            let screen = app.view::<WorkoutLog>(&day);
            warn_if_stale(&screen);
            if args.json {
                print_json(&json!({
                    "date": day.date(),
                    "exercises": &*screen.state(),
                    "summary": screen.summary(),
                }));
            } else {
                ui::print_workout(day.date(), &screen.state());
            }
        }
        WorkoutSubcommands::Add(args) => {
            let day = resolve_day(app, &args.date)?;
            let exercise = ExerciseForm {
                name: args.name,
                sets: args.sets,
            }
            .parse()?;
            let screen = app.open::<WorkoutLog>(&day);
            warn_if_stale(&screen);
            let name = exercise.name.clone();
            screen.add(exercise)?;
            println!("added {} to {}", name, day.date());
        }
        WorkoutSubcommands::Edit(args) => {
            let day = resolve_day(app, &args.date)?;
            let index = entry_index(args.index)?;
            let screen = app.open::<WorkoutLog>(&day);
            warn_if_stale(&screen);
            let existing = existing_entry(&screen, index)?;
            let sets = if args.sets.is_empty() {
                existing
                    .sets
                    .iter()
                    .map(|set| format!("{}x{}", set.reps, set.weight))
                    .collect()
            } else {
                args.sets
            };
            let exercise = ExerciseForm {
                name: args.name.unwrap_or(existing.name),
                sets,
            }
            .parse()?;
            screen.replace(index, exercise)?;
            println!("updated exercise {} on {}", index + 1, day.date());
        }
        WorkoutSubcommands::Rm(args) => {
            let day = resolve_day(app, &args.date)?;
            let index = entry_index(args.index)?;
            let screen = app.open::<WorkoutLog>(&day);
            warn_if_stale(&screen);
            let removed = screen.remove(index)?;
            println!("removed {} from {}", removed.name, day.date());
        }
    }
    Ok(())
}

fn run_cardio(app: &App<'_>, command: CardioSubcommands) -> Result<(), AppError> {
    match command {
        CardioSubcommands::Show(args) => {
            let day = resolve_day(app, &args.date)?;
            let screen = app.view::<CardioLog>(&day);
            warn_if_stale(&screen);
            if args.json {
                print_json(&json!({
                    "date": day.date(),
                    "cardio": &*screen.state(),
                    "pace_min_per_km": screen.pace_min_per_km(),
                }));
            } else {
                ui::print_cardio(day.date(), &screen.state());
            }
        }
        CardioSubcommands::Set(args) => {
            let day = resolve_day(app, &args.date)?;
            let log = CardioForm {
                distance: args.distance,
                duration: args.duration,
                calories: args.calories,
            }
            .parse()?;
            let screen = app.open::<CardioLog>(&day);
            warn_if_stale(&screen);
            screen.set(log)?;
            println!("saved cardio for {}", day.date());
        }
    }
    Ok(())
}

fn run_meal(app: &App<'_>, command: MealSubcommands) -> Result<(), AppError> {
    match command {
        MealSubcommands::Ls(args) => {
            let day = resolve_day(app, &args.date)?;
            let screen = app.view::<MealLog>(&day);
            warn_if_stale(&screen);
            if args.json {
                print_json(&json!({
                    "date": day.date(),
                    "meals": &*screen.state(),
                    "totals": screen.totals(),
                }));
            } else {
                ui::print_meals(day.date(), &screen.state());
            }
        }
        MealSubcommands::Add(args) => {
            let day = resolve_day(app, &args.date)?;
            let meal = MealForm {
                name: args.name,
                calories: args.calories,
                protein: args.protein,
                carbs: args.carbs,
                fats: args.fats,
            }
            .parse()?;
            let screen = app.open::<MealLog>(&day);
            warn_if_stale(&screen);
            let name = meal.name.clone();
            screen.add(meal)?;
            println!("added {} to {}", name, day.date());
        }
        MealSubcommands::Edit(args) => {
            let day = resolve_day(app, &args.date)?;
            let index = entry_index(args.index)?;
            let screen = app.open::<MealLog>(&day);
            warn_if_stale(&screen);
            let prefilled = MealForm::from_meal(&existing_entry(&screen, index)?);
            let meal = MealForm {
                name: args.name.unwrap_or(prefilled.name),
                calories: args.calories.unwrap_or(prefilled.calories),
                protein: args.protein.unwrap_or(prefilled.protein),
                carbs: args.carbs.unwrap_or(prefilled.carbs),
                fats: args.fats.unwrap_or(prefilled.fats),
            }
            .parse()?;
            screen.replace(index, meal)?;
            println!("updated meal {} on {}", index + 1, day.date());
        }
        MealSubcommands::Rm(args) => {
            let day = resolve_day(app, &args.date)?;
            let index = entry_index(args.index)?;
            let screen = app.open::<MealLog>(&day);
            warn_if_stale(&screen);
            let removed = screen.remove(index)?;
            println!("removed {} from {}", removed.name, day.date());
        }
    }
    Ok(())
}

fn run_water(app: &App<'_>, command: WaterSubcommands) -> Result<(), AppError> {
    match command {
        WaterSubcommands::Ls(args) => {
            let day = resolve_day(app, &args.date)?;
            let screen = app.view::<WaterLog>(&day);
            warn_if_stale(&screen);
            if args.json {
                print_json(&json!({
                    "date": day.date(),
                    "entries": &*screen.state(),
                    "total_ml": screen.total_ml(),
                }));
            } else {
                ui::print_water(day.date(), &screen.state());
            }
        }
        WaterSubcommands::Add(args) => {
            let day = resolve_day(app, &args.date)?;
            let entry = WaterForm {
                amount: args.amount,
            }
            .parse()?;
            let screen = app.open::<WaterLog>(&day);
            warn_if_stale(&screen);
            screen.add(entry)?;
            println!(
                "logged water for {}; total {} ml",
                day.date(),
                screen.total_ml()
            );
        }
        WaterSubcommands::Rm(args) => {
            let day = resolve_day(app, &args.date)?;
            let index = entry_index(args.index)?;
            let screen = app.open::<WaterLog>(&day);
            warn_if_stale(&screen);
            let removed = screen.remove(index)?;
            println!("removed {} ml from {}", removed.amount, day.date());
        }
    }
    Ok(())
}

fn resolve_day(app: &App<'_>, arg: &DateArg) -> Result<DayContext, AppError> {
    let today = today_local();
    let date = match arg.date.as_deref() {
        Some(raw) => raw.parse::<LogDate>()?,
        None => today,
    };
    app.select_day(date, today)
}

fn entry_index(number: usize) -> Result<usize, AppError> {
    number.checked_sub(1).ok_or_else(|| {
        AppError::InvalidArgument("entry numbers start at 1".to_string())
    })
}

fn existing_entry<R: crate::records::EntryList>(
    screen: &Controller<'_, R>,
    index: usize,
) -> Result<R::Entry, AppError> {
    let entries = screen.entries();
    let len = entries.len();
    entries
        .into_iter()
        .nth(index)
        .ok_or(AppError::Controller(ControllerError::IndexOutOfRange {
            index,
            len,
        }))
}

fn warn_if_stale<R: Record>(screen: &Controller<'_, R>) {
    if let Some(warning) = screen.warning() {
        ui::print_warning(&warning);
    }
}

fn prefill(value: f64) -> String {
    if value > 0.0 {
        value.to_string()
    } else {
        String::new()
    }
}

fn print_next_step(app: &App<'_>) {
    match app.route() {
        gate::Route::CompleteProfile => println!(
            "next: fitlog profile set --name <name> --age <years> --weight <kg> --height <cm>"
        ),
        gate::Route::Calendar => println!("next: fitlog calendar"),
        _ => {}
    }
}

fn day_summary(app: &App<'_>, day: &DayContext) -> ui::DaySummary {
    let workout = app.view::<WorkoutLog>(day);
    let cardio = app.view::<CardioLog>(day);
    let meals = app.view::<MealLog>(day);
    let water = app.view::<WaterLog>(day);
    let warnings = [
        workout.warning(),
        cardio.warning(),
        meals.warning(),
        water.warning(),
    ]
    .into_iter()
    .flatten()
    .collect();
    let cardio_log = cardio.state().clone();
    ui::DaySummary {
        date: day.date(),
        workout: workout.summary(),
        cardio: (!cardio_log.is_empty()).then_some(cardio_log),
        meals: meals.totals(),
        meal_count: meals.entries().len(),
        water_ml: water.total_ml(),
        warnings,
    }
}
