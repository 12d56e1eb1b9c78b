//! Session lifecycle: one controller owns the profile, the meal log, the
//! persisted records, and the view state machine. Every mutation goes
//! through a named transition method; nothing else touches the store.

use thiserror::Error;

use crate::models::{ActivityLevel, Goal, Meal, MealType, Profile, SexCategory};
use crate::services::gateway::{AnalysisError, Analyzer};
use crate::services::meal_store::MealStore;
use crate::storage::Storage;

// ─── View state machine ───

/// `Onboarding → Dashboard ⇄ {AddMeal, MealDetail}`; logout resets to
/// `Onboarding` from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Onboarding,
    Dashboard,
    AddMeal,
    MealDetail,
}

/// Binary confirm/cancel prompt shown before destructive actions. The front
/// end supplies the implementation.
pub trait ConfirmationPrompt {
    fn confirm(&self, message: &str) -> bool;
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("nothing to analyze: add a photo or a description first")]
    EmptyCapture,
    #[error("an analysis is already in progress")]
    AnalysisInFlight,
    #[error("no profile is configured yet")]
    NotConfigured,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error("failed to persist state: {0}")]
    Persistence(String),
}

/// Everything the app holds in memory.
#[derive(Debug)]
pub struct AppState {
    pub profile: Option<Profile>,
    pub meals: MealStore,
    pub view: ViewState,
    pub selected_meal_id: Option<String>,
    pub analyzing: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            profile: None,
            meals: MealStore::new(),
            view: ViewState::Onboarding,
            selected_meal_id: None,
            analyzing: false,
        }
    }
}

pub struct SessionController<A, C> {
    storage: Storage,
    analyzer: A,
    confirm: C,
    state: AppState,
}

impl<A: Analyzer, C: ConfirmationPrompt> SessionController<A, C> {
    pub fn new(storage: Storage, analyzer: A, confirm: C) -> Self {
        Self {
            storage,
            analyzer,
            confirm,
            state: AppState::default(),
        }
    }

    // ─── Read access ───

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn view(&self) -> ViewState {
        self.state.view
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.state.profile.as_ref()
    }

    pub fn meals(&self) -> &MealStore {
        &self.state.meals
    }

    pub fn selected_meal(&self) -> Option<&Meal> {
        self.state
            .selected_meal_id
            .as_deref()
            .and_then(|id| self.state.meals.get(id))
    }

    // ─── Transitions ───

    /// Startup: read both persisted records. Malformed content was already
    /// logged and dropped by the storage layer, so the session starts
    /// unconfigured in that case rather than crashing.
    pub fn load(&mut self) {
        self.state.profile = self.storage.load_profile();
        self.state.meals = MealStore::from_meals(self.storage.load_meals());
        self.state.view = if self.state.profile.is_some() {
            ViewState::Dashboard
        } else {
            ViewState::Onboarding
        };
    }

    pub fn complete_onboarding(
        &mut self,
        name: &str,
        age: u32,
        sex: SexCategory,
        height_cm: f64,
        weight_kg: f64,
        activity_level: ActivityLevel,
        goal: Goal,
    ) -> Result<&Profile, SessionError> {
        let profile = Profile::new(name, age, sex, height_cm, weight_kg, activity_level, goal);
        self.storage.save_profile(&profile).map_err(persistence)?;
        self.state.view = ViewState::Dashboard;
        Ok(self.state.profile.insert(profile))
    }

    /// One capture, all-or-nothing: the meal exists only after the analyzer
    /// succeeded and the log was persisted. Submission is blocked while a
    /// previous analysis is still in flight, and a capture with neither
    /// image nor text never reaches the service.
    pub async fn submit_capture(
        &mut self,
        meal_type: MealType,
        image_uri: Option<String>,
        text_description: Option<String>,
    ) -> Result<&Meal, SessionError> {
        let profile = match self.state.profile.clone() {
            Some(profile) => profile,
            None => return Err(SessionError::NotConfigured),
        };
        if self.state.analyzing {
            return Err(SessionError::AnalysisInFlight);
        }
        let image_uri = image_uri.filter(|s| !s.trim().is_empty());
        let text_description = text_description.filter(|s| !s.trim().is_empty());
        if image_uri.is_none() && text_description.is_none() {
            return Err(SessionError::EmptyCapture);
        }

        self.state.analyzing = true;
        let result = self
            .analyzer
            .analyze(image_uri.as_deref(), text_description.as_deref(), &profile)
            .await;
        self.state.analyzing = false;
        let analysis = result?;

        let meal = Meal::new(meal_type, image_uri, text_description, analysis);
        let id = meal.id.clone();
        self.state.meals.add(meal);
        self.storage
            .save_meals(self.state.meals.meals())
            .map_err(persistence)?;
        self.state.selected_meal_id = Some(id.clone());
        self.state.view = ViewState::MealDetail;
        match self.state.meals.get(&id) {
            Some(meal) => Ok(meal),
            None => Err(SessionError::Persistence(
                "meal missing after insert".to_string(),
            )),
        }
    }

    /// Returns Ok(false) when the user declines the confirmation. Removal is
    /// idempotent; the log is persisted even when it becomes empty.
    pub fn delete_meal(&mut self, id: &str) -> Result<bool, SessionError> {
        if !self.confirm.confirm("Delete this meal log?") {
            return Ok(false);
        }
        self.state.meals.remove(id);
        self.storage
            .save_meals(self.state.meals.meals())
            .map_err(persistence)?;
        if self.state.selected_meal_id.as_deref() == Some(id) {
            self.state.selected_meal_id = None;
            self.state.view = ViewState::Dashboard;
        }
        Ok(true)
    }

    /// Returns Ok(false) when the user declines. Otherwise clears both
    /// persisted records and resets to a fresh onboarding state.
    pub fn logout(&mut self) -> Result<bool, SessionError> {
        if !self
            .confirm
            .confirm("Log out? This clears this device's data for the app.")
        {
            return Ok(false);
        }
        self.storage.clear().map_err(persistence)?;
        self.state = AppState::default();
        Ok(true)
    }

    // ─── Navigation ───

    pub fn open_add_meal(&mut self) {
        if self.state.view == ViewState::Dashboard {
            self.state.view = ViewState::AddMeal;
        }
    }

    pub fn cancel_add_meal(&mut self) {
        if self.state.view == ViewState::AddMeal {
            self.state.view = ViewState::Dashboard;
        }
    }

    pub fn view_meal(&mut self, id: &str) -> bool {
        if self.state.meals.get(id).is_none() {
            return false;
        }
        self.state.selected_meal_id = Some(id.to_string());
        self.state.view = ViewState::MealDetail;
        true
    }

    pub fn back_to_dashboard(&mut self) {
        self.state.selected_meal_id = None;
        self.state.view = ViewState::Dashboard;
    }
}

fn persistence(err: anyhow::Error) -> SessionError {
    SessionError::Persistence(err.to_string())
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::Local;

    use super::*;
    use crate::models::{HealthVerdict, Macros, NutritionAnalysis};

    struct FixedAnalyzer {
        analysis: NutritionAnalysis,
    }

    #[async_trait]
    impl Analyzer for FixedAnalyzer {
        async fn analyze(
            &self,
            _image_base64: Option<&str>,
            _text_description: Option<&str>,
            _profile: &Profile,
        ) -> Result<NutritionAnalysis, AnalysisError> {
            Ok(self.analysis.clone())
        }
    }

    struct FailingAnalyzer;

    #[async_trait]
    impl Analyzer for FailingAnalyzer {
        async fn analyze(
            &self,
            _image_base64: Option<&str>,
            _text_description: Option<&str>,
            _profile: &Profile,
        ) -> Result<NutritionAnalysis, AnalysisError> {
            Err(AnalysisError::EmptyResponse)
        }
    }

    struct AutoConfirm(bool);

    impl ConfirmationPrompt for AutoConfirm {
        fn confirm(&self, _message: &str) -> bool {
            self.0
        }
    }

    fn analysis(calories: f64) -> NutritionAnalysis {
        NutritionAnalysis {
            food_name: "Ramen".to_string(),
            calories,
            macros: Macros {
                protein: 22.0,
                carbs: 70.0,
                fat: 18.0,
            },
            burn_time_minutes: 130.0,
            score: 48,
            verdict: HealthVerdict::HighCalorie,
            secondary_verdicts: vec![],
            goal_alignment: "Heavy for your goal.".to_string(),
            portion_guidance: "Share the bowl.".to_string(),
            frequency_guidance: "Rarely.".to_string(),
            allergens: vec![],
            risk_flags: vec!["High Sodium".to_string()],
        }
    }

    fn controller<A: Analyzer>(
        dir: &std::path::Path,
        analyzer: A,
        confirm: bool,
    ) -> SessionController<A, AutoConfirm> {
        let storage = Storage::new(dir);
        storage.init().unwrap();
        SessionController::new(storage, analyzer, AutoConfirm(confirm))
    }

    fn onboard<A: Analyzer, C: ConfirmationPrompt>(session: &mut SessionController<A, C>) {
        session
            .complete_onboarding(
                "Dana",
                30,
                SexCategory::Female,
                170.0,
                70.0,
                ActivityLevel::Moderate,
                Goal::Maintain,
            )
            .unwrap();
    }

    #[test]
    fn fresh_start_lands_on_onboarding() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FailingAnalyzer, true);
        session.load();
        assert_eq!(session.view(), ViewState::Onboarding);
        assert!(session.profile().is_none());
    }

    #[test]
    fn onboarding_computes_target_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FailingAnalyzer, true);
        session.load();
        onboard(&mut session);
        assert_eq!(session.view(), ViewState::Dashboard);
        assert_eq!(session.profile().unwrap().daily_calorie_target, 2312);

        let mut reloaded = controller(dir.path(), FailingAnalyzer, true);
        reloaded.load();
        assert_eq!(reloaded.view(), ViewState::Dashboard);
        assert_eq!(reloaded.profile().unwrap().name, "Dana");
    }

    #[tokio::test]
    async fn empty_capture_is_blocked_before_any_request() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FailingAnalyzer, true);
        session.load();
        onboard(&mut session);

        let result = session
            .submit_capture(MealType::Lunch, None, Some("   ".to_string()))
            .await;
        assert!(matches!(result, Err(SessionError::EmptyCapture)));
        assert!(session.meals().is_empty());
    }

    #[tokio::test]
    async fn capture_before_onboarding_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FixedAnalyzer { analysis: analysis(600.0) }, true);
        session.load();

        let result = session
            .submit_capture(MealType::Lunch, None, Some("toast".to_string()))
            .await;
        assert!(matches!(result, Err(SessionError::NotConfigured)));
    }

    #[tokio::test]
    async fn successful_capture_appends_persists_and_shows_detail() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FixedAnalyzer { analysis: analysis(600.0) }, true);
        session.load();
        onboard(&mut session);

        let id = session
            .submit_capture(MealType::Lunch, None, Some("chicken wrap".to_string()))
            .await
            .unwrap()
            .id
            .clone();
        assert_eq!(session.view(), ViewState::MealDetail);
        assert_eq!(session.selected_meal().unwrap().id, id);
        assert!(!session.state().analyzing);

        let today = Local::now().date_naive();
        assert_eq!(session.meals().daily_total_calories(today), 600.0);

        let mut reloaded = controller(dir.path(), FailingAnalyzer, true);
        reloaded.load();
        assert_eq!(reloaded.meals().len(), 1);
    }

    #[tokio::test]
    async fn failed_analysis_leaves_no_meal_and_reenables_submission() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FailingAnalyzer, true);
        session.load();
        onboard(&mut session);
        session.open_add_meal();

        let result = session
            .submit_capture(MealType::Dinner, None, Some("mystery stew".to_string()))
            .await;
        assert!(matches!(result, Err(SessionError::Analysis(_))));
        assert!(session.meals().is_empty());
        assert!(!session.state().analyzing);
        assert_eq!(session.view(), ViewState::AddMeal);
    }

    #[tokio::test]
    async fn delete_currently_displayed_meal_returns_to_dashboard() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FixedAnalyzer { analysis: analysis(600.0) }, true);
        session.load();
        onboard(&mut session);

        let id = session
            .submit_capture(MealType::Lunch, None, Some("wrap".to_string()))
            .await
            .unwrap()
            .id
            .clone();
        assert!(session.delete_meal(&id).unwrap());
        assert_eq!(session.view(), ViewState::Dashboard);
        assert!(session.selected_meal().is_none());
        assert!(session.meals().is_empty());

        // Deleting again is a no-op, not an error.
        assert!(session.delete_meal(&id).unwrap());
    }

    #[tokio::test]
    async fn declined_confirmations_change_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FixedAnalyzer { analysis: analysis(600.0) }, false);
        session.load();
        onboard(&mut session);

        let id = session
            .submit_capture(MealType::Lunch, None, Some("wrap".to_string()))
            .await
            .unwrap()
            .id
            .clone();
        assert!(!session.delete_meal(&id).unwrap());
        assert_eq!(session.meals().len(), 1);
        assert_eq!(session.view(), ViewState::MealDetail);

        assert!(!session.logout().unwrap());
        assert!(session.profile().is_some());
    }

    #[tokio::test]
    async fn logout_clears_everything_and_returns_to_onboarding() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FixedAnalyzer { analysis: analysis(600.0) }, true);
        session.load();
        onboard(&mut session);
        session
            .submit_capture(MealType::Lunch, None, Some("wrap".to_string()))
            .await
            .unwrap();

        assert!(session.logout().unwrap());
        assert_eq!(session.view(), ViewState::Onboarding);
        assert!(session.profile().is_none());
        assert!(session.meals().is_empty());

        let mut reloaded = controller(dir.path(), FailingAnalyzer, true);
        reloaded.load();
        assert_eq!(reloaded.view(), ViewState::Onboarding);
        assert!(reloaded.profile().is_none());
        assert!(reloaded.meals().is_empty());
    }

    #[test]
    fn navigation_transitions() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = controller(dir.path(), FailingAnalyzer, true);
        session.load();
        onboard(&mut session);

        session.open_add_meal();
        assert_eq!(session.view(), ViewState::AddMeal);
        session.cancel_add_meal();
        assert_eq!(session.view(), ViewState::Dashboard);

        assert!(!session.view_meal("missing"));
        assert_eq!(session.view(), ViewState::Dashboard);
    }
}
