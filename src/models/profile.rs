use serde::{Deserialize, Serialize};

use crate::services::calculator;

/// Biological sex category. Only used to pick the BMR formula branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SexCategory {
    Male,
    Female,
    Other,
}

impl SexCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            SexCategory::Male => "MALE",
            SexCategory::Female => "FEMALE",
            SexCategory::Other => "OTHER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "SEDENTARY",
            ActivityLevel::Light => "LIGHT",
            ActivityLevel::Moderate => "MODERATE",
            ActivityLevel::Active => "ACTIVE",
            ActivityLevel::VeryActive => "VERY_ACTIVE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Goal {
    Lose,
    Maintain,
    Gain,
}

impl Goal {
    pub fn as_str(self) -> &'static str {
        match self {
            Goal::Lose => "LOSE",
            Goal::Maintain => "MAINTAIN",
            Goal::Gain => "GAIN",
        }
    }
}

/// The single device user. `daily_calorie_target` is always derived from the
/// other fields; there is no setter for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub age: u32,
    #[serde(rename = "gender")]
    pub sex: SexCategory,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub daily_calorie_target: i32,
    pub is_configured: bool,
}

impl Profile {
    pub fn new(
        name: &str,
        age: u32,
        sex: SexCategory,
        height_cm: f64,
        weight_kg: f64,
        activity_level: ActivityLevel,
        goal: Goal,
    ) -> Self {
        let daily_calorie_target =
            calculator::compute_daily_target(weight_kg, height_cm, age, sex, activity_level, goal);
        Self {
            name: name.to_string(),
            age,
            sex,
            height_cm,
            weight_kg,
            activity_level,
            goal,
            daily_calorie_target,
            is_configured: true,
        }
    }

    /// Re-derives the target after a biometric or goal change.
    pub fn recompute_target(&mut self) {
        self.daily_calorie_target = calculator::compute_daily_target(
            self.weight_kg,
            self.height_cm,
            self.age,
            self.sex,
            self.activity_level,
            self.goal,
        );
    }
}
