use crate::records::{
    parse_number, require_text, CardioLog, Exercise, Meal, Profile, Record, SetEntry,
    ValidationError, WaterEntry,
};

/// The set picker offers one to five sets.
pub const MAX_SETS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MealForm {
    pub name: String,
    pub calories: String,
    pub protein: String,
    pub carbs: String,
    pub fats: String,
}

impl MealForm {
    pub fn from_meal(meal: &Meal) -> Self {
        Self {
            name: meal.name.clone(),
            calories: meal.calories.to_string(),
            protein: meal.protein.to_string(),
            carbs: meal.carbs.to_string(),
            fats: meal.fats.to_string(),
        }
    }

    pub fn parse(&self) -> Result<Meal, ValidationError> {
        require_text("name", &self.name)?;
        let meal = Meal {
            name: self.name.trim().to_string(),
            calories: parse_number("calories", &self.calories)?,
            protein: parse_number("protein", &self.protein)?,
            carbs: parse_number("carbs", &self.carbs)?,
            fats: parse_number("fats", &self.fats)?,
        };
        meal.validate("meal")?;
        Ok(meal)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WaterForm {
    pub amount: String,
}

impl WaterForm {
    pub fn parse(&self) -> Result<WaterEntry, ValidationError> {
        let amount = parse_number("amount", &self.amount)?;
        if amount <= 0.0 {
            return Err(ValidationError::new(
                "amount",
                "please enter a valid amount greater than zero",
            ));
        }
        Ok(WaterEntry { amount })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardioForm {
    pub distance: String,
    pub duration: String,
    pub calories: String,
}

impl CardioForm {
    pub fn parse(&self) -> Result<CardioLog, ValidationError> {
        let log = CardioLog {
            distance: self.distance.trim().to_string(),
            duration: self.duration.trim().to_string(),
            calories: self.calories.trim().to_string(),
        };
        log.validate()?;
        Ok(log)
    }
}

/// An exercise as typed on the terminal: a name plus `REPSxWEIGHT` sets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExerciseForm {
    pub name: String,
    pub sets: Vec<String>,
}

impl ExerciseForm {
    pub fn parse(&self) -> Result<Exercise, ValidationError> {
        require_text("name", &self.name)?;
        if self.sets.is_empty() || self.sets.len() > MAX_SETS {
            return Err(ValidationError::new(
                "sets",
                format!("choose between 1 and {MAX_SETS} sets"),
            ));
        }
        let sets = self
            .sets
            .iter()
            .enumerate()
            .map(|(index, raw)| parse_set(index, raw))
            .collect::<Result<Vec<_>, _>>()?;
        let exercise = Exercise {
            name: self.name.trim().to_string(),
            sets,
        };
        exercise.validate("exercise")?;
        Ok(exercise)
    }
}

fn parse_set(index: usize, raw: &str) -> Result<SetEntry, ValidationError> {
    let field = format!("sets[{index}]");
    let (reps, weight) = raw
        .trim()
        .split_once(['x', 'X'])
        .ok_or_else(|| ValidationError::new(&field, format!("'{raw}' is not REPSxWEIGHT")))?;
    parse_number(&format!("{field}.reps"), reps)?;
    parse_number(&format!("{field}.weight"), weight)?;
    Ok(SetEntry {
        reps: reps.trim().to_string(),
        weight: weight.trim().to_string(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub age: String,
    pub weight: String,
    pub height: String,
}

impl ProfileForm {
    pub fn parse(&self) -> Result<Profile, ValidationError> {
        require_text("name", &self.name)?;
        require_text("age", &self.age)?;
        let age = self.age.trim().parse::<u32>().map_err(|_| {
            ValidationError::new("age", format!("'{}' is not a whole number", self.age.trim()))
        })?;
        let profile = Profile {
            name: self.name.trim().to_string(),
            age,
            weight: parse_number("weight", &self.weight)?,
            height: parse_number("height", &self.height)?,
        };
        profile.validate()?;
        Ok(profile)
    }
}
