//! Insertion-ordered meal log with day-bucketed aggregates.

use chrono::{DateTime, Duration, Local, NaiveDate, Utc};

use crate::models::Meal;

/// One day of the weekly overview.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySummary {
    pub date: NaiveDate,
    /// Short weekday label, e.g. "Mon".
    pub day_label: String,
    pub total_calories: f64,
    pub over_target: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MealStore {
    meals: Vec<Meal>,
}

impl MealStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_meals(meals: Vec<Meal>) -> Self {
        Self { meals }
    }

    pub fn meals(&self) -> &[Meal] {
        &self.meals
    }

    pub fn len(&self) -> usize {
        self.meals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Meal> {
        self.meals.iter().find(|m| m.id == id)
    }

    /// Appends a meal. Existing entries are never touched.
    pub fn add(&mut self, meal: Meal) {
        self.meals.push(meal);
    }

    /// Removes the meal with the matching id. Absent ids are a no-op, so
    /// deletion is idempotent.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.meals.len();
        self.meals.retain(|m| m.id != id);
        self.meals.len() != before
    }

    /// Meals whose capture time falls on the given local calendar day, in
    /// insertion order.
    pub fn list_for_day(&self, date: NaiveDate) -> Vec<&Meal> {
        self.meals
            .iter()
            .filter(|m| local_day(m.timestamp) == Some(date))
            .collect()
    }

    pub fn daily_total_calories(&self, date: NaiveDate) -> f64 {
        self.list_for_day(date)
            .iter()
            .map(|m| m.analysis.calories)
            .sum()
    }

    /// `days` consecutive local calendar days ending at `end_date` inclusive,
    /// oldest first. `over_target` is evaluated against the target passed at
    /// query time, not whatever the target was when the meals were logged.
    pub fn weekly_series(
        &self,
        end_date: NaiveDate,
        days: usize,
        daily_target: i32,
    ) -> Vec<DaySummary> {
        (0..days)
            .rev()
            .map(|back| {
                let date = end_date - Duration::days(back as i64);
                let total = self.daily_total_calories(date);
                DaySummary {
                    date,
                    day_label: date.format("%a").to_string(),
                    total_calories: total,
                    over_target: total > f64::from(daily_target),
                }
            })
            .collect()
    }
}

/// Local calendar day a capture timestamp falls on. Boundaries are re-derived
/// on every call so queries stay correct across midnight.
fn local_day(timestamp_ms: i64) -> Option<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|utc| utc.with_timezone(&Local).date_naive())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::{HealthVerdict, Macros, MealType, NutritionAnalysis};

    fn analysis(calories: f64) -> NutritionAnalysis {
        NutritionAnalysis {
            food_name: "Oatmeal".to_string(),
            calories,
            macros: Macros {
                protein: 10.0,
                carbs: 50.0,
                fat: 5.0,
            },
            burn_time_minutes: 45.0,
            score: 80,
            verdict: HealthVerdict::NeededForBody,
            secondary_verdicts: vec![],
            goal_alignment: "Fits your goal.".to_string(),
            portion_guidance: "One bowl.".to_string(),
            frequency_guidance: "Daily is fine.".to_string(),
            allergens: vec![],
            risk_flags: vec![],
        }
    }

    fn meal_on(date: NaiveDate, calories: f64) -> Meal {
        let noon = date.and_hms_opt(12, 0, 0).unwrap();
        let timestamp = Local
            .from_local_datetime(&noon)
            .single()
            .unwrap()
            .timestamp_millis();
        Meal {
            timestamp,
            ..Meal::new(MealType::Lunch, None, Some("test".to_string()), analysis(calories))
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn daily_total_matches_current_contents() {
        let today = day(2025, 3, 10);
        let mut store = MealStore::new();
        assert_eq!(store.daily_total_calories(today), 0.0);

        store.add(meal_on(today, 600.0));
        store.add(meal_on(today, 250.0));
        store.add(meal_on(day(2025, 3, 9), 900.0));
        assert_eq!(store.daily_total_calories(today), 850.0);
        assert_eq!(store.list_for_day(today).len(), 2);

        let id = store.meals()[0].id.clone();
        assert!(store.remove(&id));
        assert_eq!(store.daily_total_calories(today), 250.0);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut store = MealStore::new();
        store.add(meal_on(day(2025, 3, 10), 400.0));
        let id = store.meals()[0].id.clone();

        assert!(store.remove(&id));
        assert!(!store.remove(&id));
        assert!(!store.remove("not-a-meal"));
        assert!(store.is_empty());
    }

    #[test]
    fn list_for_day_keeps_insertion_order() {
        let today = day(2025, 3, 10);
        let mut store = MealStore::new();
        store.add(meal_on(today, 100.0));
        store.add(meal_on(today, 200.0));
        store.add(meal_on(today, 300.0));

        let calories: Vec<f64> = store
            .list_for_day(today)
            .iter()
            .map(|m| m.analysis.calories)
            .collect();
        assert_eq!(calories, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn weekly_series_shape_and_order() {
        let end = day(2025, 3, 10);
        let mut store = MealStore::new();
        store.add(meal_on(end, 500.0));
        store.add(meal_on(day(2025, 3, 4), 2500.0));

        let series = store.weekly_series(end, 7, 2000);
        assert_eq!(series.len(), 7);
        assert_eq!(series[0].date, day(2025, 3, 4));
        assert_eq!(series[6].date, end);
        assert!(series[0].over_target);
        assert!(!series[6].over_target);
        assert_eq!(series[0].total_calories, 2500.0);
        assert_eq!(series[3].total_calories, 0.0);
    }

    #[test]
    fn over_target_uses_target_at_query_time() {
        let end = day(2025, 3, 10);
        let mut store = MealStore::new();
        store.add(meal_on(end, 1500.0));

        let strict = store.weekly_series(end, 1, 1000);
        let relaxed = store.weekly_series(end, 1, 2000);
        assert!(strict[0].over_target);
        assert!(!relaxed[0].over_target);
    }

    #[test]
    fn exact_target_is_not_over() {
        let end = day(2025, 3, 10);
        let mut store = MealStore::new();
        store.add(meal_on(end, 2000.0));

        let series = store.weekly_series(end, 1, 2000);
        assert!(!series[0].over_target);
    }
}
