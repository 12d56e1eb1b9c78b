//! Thin terminal front over the session controller: prompt, parse, dispatch.
//! All logic lives in the library crate.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Local;

use nutria::models::{ActivityLevel, Goal, Meal, MealType, SexCategory};
use nutria::services::calculator::DEFAULT_DAILY_TARGET;
use nutria::services::gateway::{Analyzer, GeminiAnalyzer};
use nutria::session::{ConfirmationPrompt, SessionController, SessionError, ViewState};
use nutria::storage::Storage;
use nutria::utils::config;

struct StdinPrompt;

impl ConfirmationPrompt for StdinPrompt {
    fn confirm(&self, message: &str) -> bool {
        matches!(
            prompt(&format!("{message} [y/N]: ")).as_deref(),
            Some("y") | Some("Y") | Some("yes")
        )
    }
}

fn prompt(label: &str) -> Option<String> {
    print!("{label}");
    io::stdout().flush().ok()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    let trimmed = line.trim().to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn ask(label: &str) -> String {
    loop {
        if let Some(value) = prompt(label) {
            return value;
        }
    }
}

fn ask_number<T: std::str::FromStr>(label: &str) -> T {
    loop {
        if let Some(value) = prompt(label) {
            if let Ok(parsed) = value.parse::<T>() {
                return parsed;
            }
        }
        println!("Please enter a number.");
    }
}

fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NUTRIA_DATA_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir()
        .map(|d| d.join("nutria"))
        .unwrap_or_else(|| PathBuf::from(".nutria"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_dotenv();
    env_logger::init();

    let storage = Storage::new(data_dir());
    storage.init()?;

    let mut settings = storage.load_settings();
    config::apply_env_defaults(&mut settings);
    if settings.ai.api_key.is_empty() {
        println!("Note: GEMINI_API_KEY is not set; meal analysis will fail until it is.");
    }

    let analyzer = GeminiAnalyzer::new(&settings.ai.api_key, &settings.ai.model);
    let mut session = SessionController::new(storage, analyzer, StdinPrompt);
    session.load();

    loop {
        match session.view() {
            ViewState::Onboarding => run_onboarding(&mut session)?,
            ViewState::Dashboard => {
                if !run_dashboard(&mut session)? {
                    break;
                }
            }
            ViewState::AddMeal => run_add_meal(&mut session).await?,
            ViewState::MealDetail => run_meal_detail(&mut session)?,
        }
    }
    Ok(())
}

fn run_onboarding<A: Analyzer, C: ConfirmationPrompt>(
    session: &mut SessionController<A, C>,
) -> anyhow::Result<()> {
    println!("\n=== Welcome to Nutria ===");
    println!(
        "A few questions to set your daily calorie target (replaces the {} kcal default).",
        DEFAULT_DAILY_TARGET
    );
    let name = ask("Name: ");
    let age: u32 = ask_number("Age: ");
    let sex = loop {
        match ask("Sex (m/f/o): ").to_lowercase().as_str() {
            "m" => break SexCategory::Male,
            "f" => break SexCategory::Female,
            "o" => break SexCategory::Other,
            _ => println!("Enter m, f, or o."),
        }
    };
    let height_cm: f64 = ask_number("Height (cm): ");
    let weight_kg: f64 = ask_number("Weight (kg): ");
    let activity_level = loop {
        match ask("Activity: 1 sedentary, 2 light, 3 moderate, 4 active, 5 very active: ").as_str()
        {
            "1" => break ActivityLevel::Sedentary,
            "2" => break ActivityLevel::Light,
            "3" => break ActivityLevel::Moderate,
            "4" => break ActivityLevel::Active,
            "5" => break ActivityLevel::VeryActive,
            _ => println!("Enter 1-5."),
        }
    };
    let goal = loop {
        match ask("Goal: 1 lose, 2 maintain, 3 gain: ").as_str() {
            "1" => break Goal::Lose,
            "2" => break Goal::Maintain,
            "3" => break Goal::Gain,
            _ => println!("Enter 1-3."),
        }
    };
    let profile =
        session.complete_onboarding(&name, age, sex, height_cm, weight_kg, activity_level, goal)?;
    println!("Your daily target: {} kcal.", profile.daily_calorie_target);
    Ok(())
}

fn run_dashboard<A: Analyzer, C: ConfirmationPrompt>(
    session: &mut SessionController<A, C>,
) -> anyhow::Result<bool> {
    let today = Local::now().date_naive();
    let (name, target) = match session.profile() {
        Some(profile) => (profile.name.clone(), profile.daily_calorie_target),
        None => return Ok(true),
    };
    let total = session.meals().daily_total_calories(today);

    println!("\n=== Hello, {name} ===");
    if total > f64::from(target) {
        println!(
            "Today: {total:.0} / {target} kcal — {:.0} kcal over target.",
            total - f64::from(target)
        );
    } else {
        println!(
            "Today: {total:.0} / {target} kcal ({:.0} kcal remaining)",
            f64::from(target) - total
        );
    }

    println!("Last 7 days:");
    for day in session.meals().weekly_series(today, 7, target) {
        let marker = if day.over_target { "  over" } else { "" };
        println!("  {} {:>6.0} kcal{}", day.day_label, day.total_calories, marker);
    }

    let todays: Vec<(String, String, f64)> = session
        .meals()
        .list_for_day(today)
        .iter()
        .rev()
        .map(|m| {
            (
                m.id.clone(),
                format!("{} — {}", m.meal_type.as_str(), m.analysis.food_name),
                m.analysis.calories,
            )
        })
        .collect();
    if !todays.is_empty() {
        println!("Today's meals:");
        for (i, (_, label, calories)) in todays.iter().enumerate() {
            println!("  {}. {label} ({calories:.0} kcal)", i + 1);
        }
    }

    let input = ask("[a]dd meal, [v]iew <n>, [d]elete <n>, [l]ogout, [q]uit: ");
    let mut words = input.split_whitespace();
    match (words.next(), words.next()) {
        (Some("a"), _) => session.open_add_meal(),
        (Some("v"), Some(n)) => {
            match n
                .parse::<usize>()
                .ok()
                .and_then(|n| todays.get(n.wrapping_sub(1)))
            {
                Some((id, _, _)) => {
                    session.view_meal(id);
                }
                None => println!("No such meal."),
            }
        }
        (Some("d"), Some(n)) => {
            match n
                .parse::<usize>()
                .ok()
                .and_then(|n| todays.get(n.wrapping_sub(1)))
            {
                Some((id, _, _)) => {
                    let id = id.clone();
                    session.delete_meal(&id)?;
                }
                None => println!("No such meal."),
            }
        }
        (Some("l"), _) => {
            session.logout()?;
        }
        (Some("q"), _) => return Ok(false),
        _ => println!("Unrecognized command."),
    }
    Ok(true)
}

async fn run_add_meal<A: Analyzer, C: ConfirmationPrompt>(
    session: &mut SessionController<A, C>,
) -> anyhow::Result<()> {
    println!("\n=== Log a meal === ('c' to cancel)");
    let meal_type = loop {
        match ask("Type: 1 breakfast, 2 lunch, 3 dinner, 4 snack: ").as_str() {
            "1" => break MealType::Breakfast,
            "2" => break MealType::Lunch,
            "3" => break MealType::Dinner,
            "4" => break MealType::Snack,
            "c" => {
                session.cancel_add_meal();
                return Ok(());
            }
            _ => println!("Enter 1-4."),
        }
    };

    let image_uri = match prompt("Image file (optional): ") {
        Some(path) => match std::fs::read(&path) {
            Ok(bytes) => {
                let mime = if path.to_lowercase().ends_with(".png") {
                    "image/png"
                } else {
                    "image/jpeg"
                };
                Some(format!("data:{mime};base64,{}", BASE64.encode(bytes)))
            }
            Err(e) => {
                println!("Could not read {path}: {e}");
                None
            }
        },
        None => None,
    };
    let text_description = prompt("Description (optional): ");

    println!("Analyzing...");
    match session
        .submit_capture(meal_type, image_uri, text_description)
        .await
    {
        Ok(meal) => println!(
            "Logged {} ({:.0} kcal).",
            meal.analysis.food_name, meal.analysis.calories
        ),
        Err(SessionError::EmptyCapture) => println!("Add a photo or a description first."),
        Err(e) => println!("Analysis failed: {e}\nNothing was logged — try again."),
    }
    Ok(())
}

fn run_meal_detail<A: Analyzer, C: ConfirmationPrompt>(
    session: &mut SessionController<A, C>,
) -> anyhow::Result<()> {
    let id = match session.selected_meal() {
        Some(meal) => {
            print_meal(meal);
            meal.id.clone()
        }
        None => {
            session.back_to_dashboard();
            return Ok(());
        }
    };
    match ask("[b]ack, [d]elete: ").as_str() {
        "d" => {
            session.delete_meal(&id)?;
        }
        _ => session.back_to_dashboard(),
    }
    Ok(())
}

fn print_meal(meal: &Meal) {
    let analysis = &meal.analysis;
    println!("\n=== {} — {} ===", meal.meal_type.as_str(), analysis.food_name);
    println!("Calories: {:.0} kcal", analysis.calories);
    println!(
        "Macros: {:.0}g protein / {:.0}g carbs / {:.0}g fat",
        analysis.macros.protein, analysis.macros.carbs, analysis.macros.fat
    );
    println!("Burn time: {:.0} min brisk walk", analysis.burn_time_minutes);
    print!("Score: {}/100 — {}", analysis.score, analysis.verdict.label());
    for verdict in &analysis.secondary_verdicts {
        print!(", {}", verdict.label());
    }
    println!();
    println!("Goal: {}", analysis.goal_alignment);
    println!("Portion: {}", analysis.portion_guidance);
    println!("Frequency: {}", analysis.frequency_guidance);
    if !analysis.allergens.is_empty() {
        println!("Allergens: {}", analysis.allergens.join(", "));
    }
    if !analysis.risk_flags.is_empty() {
        println!("Risk flags: {}", analysis.risk_flags.join(", "));
    }
    if let Some(text) = &meal.text_description {
        println!("Description: {text}");
    }
}
