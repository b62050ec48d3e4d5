use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, Parser, Subcommand};

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

#[derive(Debug, Parser)]
#[command(name = "fitlog")]
#[command(bin_name = "fitlog")]
#[command(version)]
#[command(about = "Log workouts, cardio, meals and water against a calendar")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        long,
        env = "FITLOG_HOME",
        default_value = ".fitlog",
        help = "Directory holding config.toml, the session and the local cache."
    )]
    pub home: PathBuf,

    #[arg(
        long,
        env = "FITLOG_REMOTE_ROOT",
        help = "Shared record store directory (defaults to [remote] root in config.toml)."
    )]
    pub remote: Option<PathBuf>,

    #[arg(
        short = 'd',
        long,
        env = "FITLOG_DB_PATH",
        help = "Path to the local SQLite cache database."
    )]
    pub db: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Create the home directory, default config and cache database.")]
    Init,
    #[command(flatten)]
    App(AppCommands),
}

/// Commands that run against a launched app.
#[derive(Debug, Subcommand)]
pub enum AppCommands {
    #[command(about = "Create an account and sign in.")]
    Register(CredentialArgs),
    #[command(about = "Sign in with email and password.")]
    Login(CredentialArgs),
    #[command(about = "Sign out and clear the local cache.")]
    Logout,
    #[command(about = "Show the signed-in user and onboarding state.")]
    Status(JsonArgs),
    #[command(about = "Show or edit your profile.")]
    Profile(ProfileArgs),
    #[command(about = "Show a month calendar.")]
    Calendar(CalendarArgs),
    #[command(about = "Summarize every tab of one day.")]
    Day(DayArgs),
    #[command(about = "Log strength exercises.")]
    Workout(WorkoutArgs),
    #[command(about = "Log the day's cardio session.")]
    Cardio(CardioArgs),
    #[command(about = "Log meals and macros.")]
    Meal(MealArgs),
    #[command(about = "Log water intake.")]
    Water(WaterArgs),
}

#[derive(Debug, Args)]
pub struct CredentialArgs {
    #[arg(help = "Account email.")]
    pub email: String,

    #[arg(
        long,
        env = "FITLOG_PASSWORD",
        hide_env_values = true,
        help = "Account password (at least 6 characters)."
    )]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct JsonArgs {
    #[arg(long, help = "Emit JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DateArg {
    #[arg(long, help = "Log day as yyyy-mm-dd (defaults to today).")]
    pub date: Option<String>,
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ProfileSubcommands {
    #[command(about = "Show your profile.")]
    Show(JsonArgs),
    #[command(about = "Create or update your profile; omitted fields keep their value.")]
    Set(ProfileSetArgs),
}

#[derive(Debug, Args)]
pub struct ProfileSetArgs {
    #[arg(long, help = "Display name.")]
    pub name: Option<String>,

    #[arg(long, help = "Age in years.")]
    pub age: Option<String>,

    #[arg(long, help = "Body weight in kg.")]
    pub weight: Option<String>,

    #[arg(long, help = "Height in cm.")]
    pub height: Option<String>,
}

#[derive(Debug, Args)]
pub struct CalendarArgs {
    #[arg(long, help = "Month as yyyy-mm (defaults to the current month).")]
    pub month: Option<String>,

    #[arg(long, help = "Emit JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct DayArgs {
    #[arg(help = "Day as yyyy-mm-dd.")]
    pub date: String,

    #[arg(long, help = "Emit JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct LogListArgs {
    #[command(flatten)]
    pub date: DateArg,

    #[arg(long, help = "Emit JSON output.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct IndexArgs {
    #[arg(help = "1-based entry number as shown by ls.")]
    pub index: usize,

    #[command(flatten)]
    pub date: DateArg,
}

#[derive(Debug, Args)]
pub struct WorkoutArgs {
    #[command(subcommand)]
    pub command: WorkoutSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum WorkoutSubcommands {
    #[command(about = "List the day's exercises.")]
    Ls(LogListArgs),
    #[command(about = "Add an exercise.")]
    Add(ExerciseAddArgs),
    #[command(about = "Replace an exercise; omitted fields keep their value.")]
    Edit(ExerciseEditArgs),
    #[command(about = "Delete an exercise.")]
    Rm(IndexArgs),
}

#[derive(Debug, Args)]
pub struct ExerciseAddArgs {
    #[arg(help = "Exercise name.")]
    pub name: String,

    #[arg(
        long = "set",
        value_name = "REPSxWEIGHT",
        required = true,
        help = "One set, e.g. 10x60. Repeat for 1 to 5 sets."
    )]
    pub sets: Vec<String>,

    #[command(flatten)]
    pub date: DateArg,
}

#[derive(Debug, Args)]
pub struct ExerciseEditArgs {
    #[arg(help = "1-based exercise number as shown by ls.")]
    pub index: usize,

    #[arg(long, help = "New exercise name.")]
    pub name: Option<String>,

    #[arg(
        long = "set",
        value_name = "REPSxWEIGHT",
        help = "Replacement sets, e.g. 10x60. Repeat for 1 to 5 sets."
    )]
    pub sets: Vec<String>,

    #[command(flatten)]
    pub date: DateArg,
}

#[derive(Debug, Args)]
pub struct CardioArgs {
    #[command(subcommand)]
    pub command: CardioSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum CardioSubcommands {
    #[command(about = "Show the day's cardio session.")]
    Show(LogListArgs),
    #[command(about = "Save the day's cardio session, replacing any earlier one.")]
    Set(CardioSetArgs),
}

#[derive(Debug, Args)]
pub struct CardioSetArgs {
    #[arg(long, help = "Distance in km.")]
    pub distance: String,

    #[arg(long, help = "Duration in minutes.")]
    pub duration: String,

    #[arg(long, help = "Calories burned.")]
    pub calories: String,

    #[command(flatten)]
    pub date: DateArg,
}

#[derive(Debug, Args)]
pub struct MealArgs {
    #[command(subcommand)]
    pub command: MealSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum MealSubcommands {
    #[command(about = "List the day's meals with macro totals.")]
    Ls(LogListArgs),
    #[command(about = "Add a meal.")]
    Add(MealAddArgs),
    #[command(about = "Replace a meal; omitted fields keep their value.")]
    Edit(MealEditArgs),
    #[command(about = "Delete a meal.")]
    Rm(IndexArgs),
}

#[derive(Debug, Args)]
pub struct MealAddArgs {
    #[arg(help = "Meal name.")]
    pub name: String,

    #[arg(long, help = "Calories (kcal).")]
    pub calories: String,

    #[arg(long, help = "Protein in grams.")]
    pub protein: String,

    #[arg(long, help = "Carbohydrates in grams.")]
    pub carbs: String,

    #[arg(long, help = "Fats in grams.")]
    pub fats: String,

    #[command(flatten)]
    pub date: DateArg,
}

#[derive(Debug, Args)]
pub struct MealEditArgs {
    #[arg(help = "1-based meal number as shown by ls.")]
    pub index: usize,

    #[arg(long, help = "New meal name.")]
    pub name: Option<String>,

    #[arg(long, help = "Calories (kcal).")]
    pub calories: Option<String>,

    #[arg(long, help = "Protein in grams.")]
    pub protein: Option<String>,

    #[arg(long, help = "Carbohydrates in grams.")]
    pub carbs: Option<String>,

    #[arg(long, help = "Fats in grams.")]
    pub fats: Option<String>,

    #[command(flatten)]
    pub date: DateArg,
}

#[derive(Debug, Args)]
pub struct WaterArgs {
    #[command(subcommand)]
    pub command: WaterSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum WaterSubcommands {
    #[command(about = "List the day's water entries with the total.")]
    Ls(LogListArgs),
    #[command(about = "Add a water entry.")]
    Add(WaterAddArgs),
    #[command(about = "Delete a water entry.")]
    Rm(IndexArgs),
}

#[derive(Debug, Args)]
pub struct WaterAddArgs {
    #[arg(help = "Amount in ml.")]
    pub amount: String,

    #[command(flatten)]
    pub date: DateArg,
}
