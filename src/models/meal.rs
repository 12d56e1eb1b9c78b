use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::NutritionAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    pub fn as_str(self) -> &'static str {
        match self {
            MealType::Breakfast => "Breakfast",
            MealType::Lunch => "Lunch",
            MealType::Dinner => "Dinner",
            MealType::Snack => "Snack",
        }
    }
}

/// One logged eating event. A meal is only ever constructed together with a
/// completed analysis; there is no partially-analyzed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub id: String,
    /// Capture time, milliseconds since epoch.
    pub timestamp: i64,
    pub meal_type: MealType,
    /// Encoded image, as a data URL or raw base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_description: Option<String>,
    pub analysis: NutritionAnalysis,
}

impl Meal {
    pub fn new(
        meal_type: MealType,
        image_uri: Option<String>,
        text_description: Option<String>,
        analysis: NutritionAnalysis,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp_millis(),
            meal_type,
            image_uri,
            text_description,
            analysis,
        }
    }
}
