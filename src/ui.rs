use std::io::{self, IsTerminal};

use serde::Serialize;

use crate::auth::Identity;
use crate::calendar::{DayContext, DayTab, LogDate, MonthView};
use crate::gate::{GateState, Route};
use crate::records::{
    CardioLog, MacroTotals, Meal, MealLog, Profile, WaterLog, WorkoutLog, WorkoutSummary,
};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Everything the day screen shows across its tabs.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: LogDate,
    pub workout: WorkoutSummary,
    pub cardio: Option<CardioLog>,
    pub meals: MacroTotals,
    pub meal_count: usize,
    pub water_ml: f64,
    pub warnings: Vec<String>,
}

pub fn print_status(
    identity: Option<&Identity>,
    gate: &GateState,
    route: Route,
    reachable: &[Route],
) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Session"));
    match identity {
        Some(identity) => println!(
            "signed in as {} {}",
            palette.id(&identity.email),
            palette.dim(&format!("({})", identity.user_id))
        ),
        None => println!("{}", palette.dim("not signed in")),
    }
    let label = match gate {
        GateState::Unauthenticated => "unauthenticated",
        GateState::AuthenticatedIncompleteProfile { .. } => "profile incomplete",
        GateState::AuthenticatedComplete { .. } => "ready",
    };
    println!("gate {} -> {}", palette.state(label), route.label());
    let screens = reachable
        .iter()
        .map(|screen| screen.label())
        .collect::<Vec<_>>()
        .join(", ");
    println!("{}", palette.dim(&format!("screens: {screens}")));
}

pub fn print_profile(profile: &Profile) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Profile"));
    println!("name   {}", profile.name);
    println!("age    {}", profile.age);
    println!("weight {} kg", profile.weight);
    println!("height {} cm", profile.height);
    if let Some(bmi) = profile.bmi() {
        println!("{}", palette.dim(&format!("bmi {bmi:.1}")));
    }
}

pub fn print_month(view: &MonthView) {
    let palette = Palette::auto();
    for line in format_month(view, &palette) {
        println!("{line}");
    }
}

fn format_month(view: &MonthView, palette: &Palette) -> Vec<String> {
    let name = MONTH_NAMES
        .get(usize::from(view.month.saturating_sub(1)))
        .copied()
        .unwrap_or("?");
    let mut lines = vec![
        palette.heading(&format!("{name} {}", view.year)),
        "Su Mo Tu We Th Fr Sa".to_string(),
    ];
    let mut row = "   ".repeat(usize::from(view.leading_blanks));
    let mut column = usize::from(view.leading_blanks);
    for cell in &view.days {
        let number = format!("{:>2}", cell.date.date().day());
        let painted = if cell.is_today {
            palette.today(&number)
        } else if !cell.selectable {
            palette.dim(&number)
        } else {
            number
        };
        row.push_str(&painted);
        column += 1;
        if column % 7 == 0 {
            lines.push(row.trim_end().to_string());
            row = String::new();
        } else {
            row.push(' ');
        }
    }
    if !row.trim().is_empty() {
        lines.push(row.trim_end().to_string());
    }
    lines
}

pub fn print_day(day: &DayContext, summary: &DaySummary) {
    let palette = Palette::auto();
    println!("{}", palette.heading(&day.date().to_string()));
    for tab in day.tabs() {
        let line = match tab {
            DayTab::Workout => format!(
                "{} exercise(s), {} set(s), volume {}",
                summary.workout.exercises,
                summary.workout.sets,
                trim_number(summary.workout.volume)
            ),
            DayTab::Cardio => match &summary.cardio {
                Some(cardio) => format_cardio(cardio),
                None => "nothing logged".to_string(),
            },
            DayTab::Meals => format!(
                "{} meal(s), {}",
                summary.meal_count,
                format_totals(&summary.meals)
            ),
            DayTab::Water => format!("{} ml", trim_number(summary.water_ml)),
            DayTab::Profile => "edit with `fitlog profile set`".to_string(),
        };
        println!("{:<8} {}", palette.label(tab.label()), line);
    }
    for warning in &summary.warnings {
        print_warning(warning);
    }
}

pub fn print_workout(date: LogDate, log: &WorkoutLog) {
    let palette = Palette::auto();
    println!("{}", palette.heading(&format!("Workout {date}")));
    if log.exercises.is_empty() {
        println!("{}", palette.dim("no exercises logged"));
        return;
    }
    for (index, exercise) in log.exercises.iter().enumerate() {
        println!("{} {}", palette.id(&format!("{}.", index + 1)), exercise.name);
        for (set_index, set) in exercise.sets.iter().enumerate() {
            println!(
                "   {}",
                palette.dim(&format!(
                    "set {}: {} reps x {} kg",
                    set_index + 1,
                    set.reps,
                    set.weight
                ))
            );
        }
    }
    let summary = log.summary();
    println!(
        "{}",
        palette.dim(&format!(
            "{} set(s), volume {}",
            summary.sets,
            trim_number(summary.volume)
        ))
    );
}

pub fn print_cardio(date: LogDate, log: &CardioLog) {
    let palette = Palette::auto();
    println!("{}", palette.heading(&format!("Cardio {date}")));
    if log.is_empty() {
        println!("{}", palette.dim("no cardio logged"));
        return;
    }
    println!("{}", format_cardio(log));
}

fn format_cardio(log: &CardioLog) -> String {
    let mut line = format!(
        "{} km in {} min, {} kcal",
        log.distance, log.duration, log.calories
    );
    if let Some(pace) = log.pace_min_per_km() {
        line.push_str(&format!(" ({pace:.2} min/km)"));
    }
    line
}

pub fn print_meals(date: LogDate, log: &MealLog) {
    let palette = Palette::auto();
    println!("{}", palette.heading(&format!("Meals {date}")));
    if log.meals.is_empty() {
        println!("{}", palette.dim("no meals logged"));
        return;
    }
    for (index, meal) in log.meals.iter().enumerate() {
        println!(
            "{} {}",
            palette.id(&format!("{}.", index + 1)),
            format_meal(meal)
        );
    }
    println!("{}", palette.dim(&format!("total {}", format_totals(&log.totals()))));
}

fn format_meal(meal: &Meal) -> String {
    format!(
        "{} {} kcal (P {} / C {} / F {})",
        meal.name,
        trim_number(meal.calories),
        trim_number(meal.protein),
        trim_number(meal.carbs),
        trim_number(meal.fats)
    )
}

fn format_totals(totals: &MacroTotals) -> String {
    format!(
        "{} kcal, protein {} g, carbs {} g, fats {} g",
        trim_number(totals.calories),
        trim_number(totals.protein),
        trim_number(totals.carbs),
        trim_number(totals.fats)
    )
}

pub fn print_water(date: LogDate, log: &WaterLog) {
    let palette = Palette::auto();
    println!("{}", palette.heading(&format!("Water {date}")));
    for (index, entry) in log.entries.iter().enumerate() {
        println!(
            "{} {} ml",
            palette.id(&format!("{}.", index + 1)),
            trim_number(entry.amount)
        );
    }
    println!(
        "{}",
        palette.dim(&format!("total {} ml", trim_number(log.total_ml())))
    );
}

pub fn print_warning(message: &str) {
    let palette = Palette::stderr();
    eprintln!("{} {}", palette.warn("warning:"), message);
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn stderr() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stderr().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn label(&self, text: &str) -> String {
        self.paint("35", text)
    }

    fn today(&self, text: &str) -> String {
        self.paint("1;7;32", text)
    }

    fn warn(&self, text: &str) -> String {
        self.paint("1;33", text)
    }

    fn state(&self, state: &str) -> String {
        let upper = state.to_ascii_uppercase();
        self.paint(state_color_code(state), &format!("[{upper}]"))
    }
}

fn state_color_code(state: &str) -> &'static str {
    match state {
        "ready" => "32",
        "profile incomplete" => "33",
        "unauthenticated" => "31",
        _ => "37",
    }
}
