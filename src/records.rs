use std::error::Error;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::calendar::LogDate;
use crate::remote::RecordPath;

const PROFILE_CACHE_KEY: &str = "userProfile";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Profile,
    Workout,
    Cardio,
    Meal,
    Water,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Profile => "profile",
            Category::Workout => "workout",
            Category::Cardio => "cardio",
            Category::Meal => "meal",
            Category::Water => "water",
        }
    }

    /// Segment under `users/{uid}/logs/` holding this category's day records.
    pub fn remote_segment(self) -> &'static str {
        match self {
            Category::Profile => "profile",
            Category::Workout => "workouts",
            Category::Cardio => "cardio",
            Category::Meal => "meals",
            Category::Water => "water",
        }
    }

    pub fn cache_prefix(self) -> &'static str {
        match self {
            Category::Profile => PROFILE_CACHE_KEY,
            Category::Workout => "workout",
            Category::Cardio => "cardio",
            Category::Meal => "meals",
            Category::Water => "water",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one record: the profile of a user, or one category log for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    category: Category,
    user_id: String,
    date: Option<LogDate>,
}

impl RecordKey {
    pub fn profile(user_id: &str) -> Self {
        Self {
            category: Category::Profile,
            user_id: user_id.to_string(),
            date: None,
        }
    }

    pub fn daily(category: Category, user_id: &str, date: LogDate) -> Self {
        if category == Category::Profile {
            return Self::profile(user_id);
        }
        Self {
            category,
            user_id: user_id.to_string(),
            date: Some(date),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn date(&self) -> Option<LogDate> {
        self.date
    }

    pub fn remote_path(&self) -> RecordPath {
        match self.date {
            None => RecordPath::from_segments(["users", self.user_id.as_str(), "profile"]),
            Some(date) => RecordPath::from_segments([
                "users",
                self.user_id.as_str(),
                "logs",
                self.category.remote_segment(),
                date.to_string().as_str(),
            ]),
        }
    }

    pub fn cache_key(&self) -> String {
        match self.date {
            None => PROFILE_CACHE_KEY.to_string(),
            Some(date) => format!(
                "{}-{}-{}",
                self.category.cache_prefix(),
                self.user_id,
                date
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::new(field, "is required")
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {}", self.field, self.message)
    }
}

impl Error for ValidationError {}

/// A record schema: its category tag, empty default and required-field rules.
pub trait Record:
    Serialize + DeserializeOwned + Clone + Default + PartialEq + fmt::Debug
{
    const CATEGORY: Category;

    fn validate(&self) -> Result<(), ValidationError>;

    fn key(user_id: &str, date: LogDate) -> RecordKey {
        RecordKey::daily(Self::CATEGORY, user_id, date)
    }
}

/// Records that are an ordered list of entries edited by index.
pub trait EntryList: Record {
    type Entry: Clone + fmt::Debug;

    fn entries(&self) -> &[Self::Entry];
    fn entries_mut(&mut self) -> &mut Vec<Self::Entry>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub height: f64,
}

impl Record for Profile {
    const CATEGORY: Category = Category::Profile;

    fn validate(&self) -> Result<(), ValidationError> {
        require_text("name", &self.name)?;
        if self.age == 0 {
            return Err(ValidationError::new("age", "must be a positive whole number"));
        }
        require_positive("weight", self.weight)?;
        require_positive("height", self.height)?;
        Ok(())
    }

    fn key(user_id: &str, _date: LogDate) -> RecordKey {
        RecordKey::profile(user_id)
    }
}

impl Profile {
    /// Body mass index from kilograms and centimetres.
    pub fn bmi(&self) -> Option<f64> {
        if self.weight <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let metres = self.height / 100.0;
        Some(self.weight / (metres * metres))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetEntry {
    #[serde(default)]
    pub reps: String,
    #[serde(default)]
    pub weight: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sets: Vec<SetEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutLog {
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WorkoutSummary {
    pub exercises: usize,
    pub sets: usize,
    pub volume: f64,
}

impl Record for WorkoutLog {
    const CATEGORY: Category = Category::Workout;

    fn validate(&self) -> Result<(), ValidationError> {
        for (index, exercise) in self.exercises.iter().enumerate() {
            exercise.validate(&format!("exercises[{index}]"))?;
        }
        Ok(())
    }
}

impl Exercise {
    pub(crate) fn validate(&self, prefix: &str) -> Result<(), ValidationError> {
        require_text(&format!("{prefix}.name"), &self.name)?;
        for (index, set) in self.sets.iter().enumerate() {
            parse_number(&format!("{prefix}.sets[{index}].reps"), &set.reps)?;
            parse_number(&format!("{prefix}.sets[{index}].weight"), &set.weight)?;
        }
        Ok(())
    }
}

impl EntryList for WorkoutLog {
    type Entry = Exercise;

    fn entries(&self) -> &[Exercise] {
        &self.exercises
    }

    fn entries_mut(&mut self) -> &mut Vec<Exercise> {
        &mut self.exercises
    }
}

impl WorkoutLog {
    pub fn summary(&self) -> WorkoutSummary {
        let mut summary = WorkoutSummary {
            exercises: self.exercises.len(),
            ..WorkoutSummary::default()
        };
        for set in self.exercises.iter().flat_map(|exercise| &exercise.sets) {
            summary.sets += 1;
            let reps = set.reps.trim().parse::<f64>().unwrap_or(0.0);
            let weight = set.weight.trim().parse::<f64>().unwrap_or(0.0);
            summary.volume += reps * weight;
        }
        summary
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardioLog {
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub calories: String,
}

impl Record for CardioLog {
    const CATEGORY: Category = Category::Cardio;

    fn validate(&self) -> Result<(), ValidationError> {
        parse_number("distance", &self.distance)?;
        parse_number("duration", &self.duration)?;
        parse_number("calories", &self.calories)?;
        Ok(())
    }
}

impl CardioLog {
    pub fn is_empty(&self) -> bool {
        self.distance.trim().is_empty()
    }

    /// Minutes per kilometre, when both distance and duration parse.
    pub fn pace_min_per_km(&self) -> Option<f64> {
        let distance = self.distance.trim().parse::<f64>().ok()?;
        let duration = self.duration.trim().parse::<f64>().ok()?;
        if distance <= 0.0 || !duration.is_finite() {
            return None;
        }
        Some(duration / distance)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbs: f64,
    #[serde(default)]
    pub fats: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MealLog {
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MacroTotals {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fats: f64,
}

impl Record for MealLog {
    const CATEGORY: Category = Category::Meal;

    fn validate(&self) -> Result<(), ValidationError> {
        for (index, meal) in self.meals.iter().enumerate() {
            meal.validate(&format!("meals[{index}]"))?;
        }
        Ok(())
    }
}

impl Meal {
    pub(crate) fn validate(&self, prefix: &str) -> Result<(), ValidationError> {
        require_text(&format!("{prefix}.name"), &self.name)?;
        require_non_negative(&format!("{prefix}.calories"), self.calories)?;
        require_non_negative(&format!("{prefix}.protein"), self.protein)?;
        require_non_negative(&format!("{prefix}.carbs"), self.carbs)?;
        require_non_negative(&format!("{prefix}.fats"), self.fats)?;
        Ok(())
    }
}

impl EntryList for MealLog {
    type Entry = Meal;

    fn entries(&self) -> &[Meal] {
        &self.meals
    }

    fn entries_mut(&mut self) -> &mut Vec<Meal> {
        &mut self.meals
    }
}

impl MealLog {
    pub fn totals(&self) -> MacroTotals {
        self.meals
            .iter()
            .fold(MacroTotals::default(), |acc, meal| MacroTotals {
                calories: acc.calories + meal.calories,
                protein: acc.protein + meal.protein,
                carbs: acc.carbs + meal.carbs,
                fats: acc.fats + meal.fats,
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaterEntry {
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaterLog {
    pub entries: Vec<WaterEntry>,
}

impl Record for WaterLog {
    const CATEGORY: Category = Category::Water;

    fn validate(&self) -> Result<(), ValidationError> {
        for (index, entry) in self.entries.iter().enumerate() {
            require_positive(&format!("entries[{index}].amount"), entry.amount)?;
        }
        Ok(())
    }
}

impl EntryList for WaterLog {
    type Entry = WaterEntry;

    fn entries(&self) -> &[WaterEntry] {
        &self.entries
    }

    fn entries_mut(&mut self) -> &mut Vec<WaterEntry> {
        &mut self.entries
    }
}

impl WaterLog {
    pub fn total_ml(&self) -> f64 {
        self.entries.iter().map(|entry| entry.amount).sum()
    }
}

pub(crate) fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(())
}

/// Parses a form value that must be present and numeric.
pub(crate) fn parse_number(field: &str, raw: &str) -> Result<f64, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::missing(field));
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ValidationError::new(
            field,
            format!("'{trimmed}' is not a number"),
        )),
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(ValidationError::new(field, "must be greater than zero"))
}

fn require_non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(ValidationError::new(field, "must be zero or more"))
}
