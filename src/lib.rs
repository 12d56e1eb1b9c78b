//! Headless core of Nutria, a personal nutrition logger: profile and daily
//! calorie target, an insertion-ordered meal log with daily/weekly rollups,
//! the Gemini-backed analysis gateway, and the session controller that owns
//! persistence and the view state machine.

pub mod models;
pub mod services;
pub mod session;
pub mod storage;
pub mod utils;
