//! Daily calorie target derivation: Harris-Benedict BMR, activity-scaled
//! TDEE, goal adjustment.

use crate::models::{ActivityLevel, Goal, SexCategory};

/// Target shown during onboarding before biometrics are entered.
pub const DEFAULT_DAILY_TARGET: i32 = 2000;

/// TDEE multiplier for an activity level.
pub fn activity_multiplier(level: ActivityLevel) -> f64 {
    match level {
        ActivityLevel::Sedentary => 1.2,
        ActivityLevel::Light => 1.375,
        ActivityLevel::Moderate => 1.55,
        ActivityLevel::Active => 1.725,
        ActivityLevel::VeryActive => 1.9,
    }
}

/// Daily kcal adjustment for the user's goal.
pub fn goal_modifier(goal: Goal) -> i32 {
    match goal {
        Goal::Lose => -500,
        Goal::Maintain => 0,
        Goal::Gain => 500,
    }
}

/// Derives the daily calorie target from biometrics and goal.
///
/// BMR uses the Harris-Benedict formula, branching on the sex category
/// (FEMALE and OTHER share a branch). Inputs are assumed range-validated by
/// the onboarding front; the result is deterministic for equal inputs.
pub fn compute_daily_target(
    weight_kg: f64,
    height_cm: f64,
    age: u32,
    sex: SexCategory,
    activity_level: ActivityLevel,
    goal: Goal,
) -> i32 {
    let age = f64::from(age);
    let bmr = match sex {
        SexCategory::Male => 88.362 + 13.397 * weight_kg + 4.799 * height_cm - 5.677 * age,
        SexCategory::Female | SexCategory::Other => {
            447.593 + 9.247 * weight_kg + 3.098 * height_cm - 4.330 * age
        }
    };
    let tdee = bmr * activity_multiplier(activity_level);
    (tdee + f64::from(goal_modifier(goal))).round() as i32
}
