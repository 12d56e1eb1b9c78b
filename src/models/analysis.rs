use serde::{Deserialize, Serialize};

/// Categorical health assessment attached to a meal's analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthVerdict {
    NeededForBody,
    NotNeeded,
    Dangerous,
    Useless,
    HighCalorie,
    VeryUnhealthy,
    HighChemicals,
}

impl HealthVerdict {
    pub const ALL: [HealthVerdict; 7] = [
        HealthVerdict::NeededForBody,
        HealthVerdict::NotNeeded,
        HealthVerdict::Dangerous,
        HealthVerdict::Useless,
        HealthVerdict::HighCalorie,
        HealthVerdict::VeryUnhealthy,
        HealthVerdict::HighChemicals,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HealthVerdict::NeededForBody => "NEEDED_FOR_BODY",
            HealthVerdict::NotNeeded => "NOT_NEEDED",
            HealthVerdict::Dangerous => "DANGEROUS",
            HealthVerdict::Useless => "USELESS",
            HealthVerdict::HighCalorie => "HIGH_CALORIE",
            HealthVerdict::VeryUnhealthy => "VERY_UNHEALTHY",
            HealthVerdict::HighChemicals => "HIGH_CHEMICALS",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| v.as_str() == token)
    }

    /// Human-readable label for a front end.
    pub fn label(self) -> &'static str {
        match self {
            HealthVerdict::NeededForBody => "Needed for Body",
            HealthVerdict::NotNeeded => "Not Needed",
            HealthVerdict::Dangerous => "Dangerous for Body",
            HealthVerdict::Useless => "Useless for Body",
            HealthVerdict::HighCalorie => "High Calorie Count",
            HealthVerdict::VeryUnhealthy => "Very Unhealthy",
            HealthVerdict::HighChemicals => "High Chemicals",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

/// The externally produced assessment, embedded verbatim in a meal. Opaque
/// once attached; never recomputed locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionAnalysis {
    pub food_name: String,
    pub calories: f64,
    pub macros: Macros,
    /// Minutes of brisk walking to burn these calories.
    pub burn_time_minutes: f64,
    /// 0-100, 100 is perfectly healthy for this user's goals.
    pub score: u8,
    pub verdict: HealthVerdict,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_verdicts: Vec<HealthVerdict>,
    pub goal_alignment: String,
    pub portion_guidance: String,
    pub frequency_guidance: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allergens: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_flags: Vec<String>,
}
