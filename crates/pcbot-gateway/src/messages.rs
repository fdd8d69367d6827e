//! User-facing reply texts (Telegram "Markdown" flavour).

use chrono::{DateTime, Utc};
use pcbot_timer::{ActiveTimer, ParseDurationError, TimerConfirmation, humanize};
use pcbot_types::PendingAction;

use crate::command::MENU;

fn title(action: PendingAction) -> &'static str {
    match action {
        PendingAction::Shutdown => "Shutdown",
        PendingAction::Restart => "Restart",
    }
}

fn fire_time(fire_at: Option<DateTime<Utc>>) -> String {
    fire_at
        .map(|at| format!(" (at {} UTC)", at.format("%Y-%m-%d %H:%M:%S")))
        .unwrap_or_default()
}

/// Escape `_` so Markdown does not read command names as italics.
fn escape_markdown(text: &str) -> String {
    text.replace('_', "\\_")
}

pub fn help() -> String {
    let mut text = String::from("🖥️ *PC Control Bot*\n\n*Available commands:*\n");
    for (name, description) in MENU {
        text.push_str(&format!("/{} - {description}\n", escape_markdown(name)));
    }
    text.push_str("\nTimer format: `30s`, `5m`, `1.5h`");
    text
}

pub fn startup() -> String {
    format!("🚀 *PC Control Bot is now running!*\n\n{}", help())
}

pub fn executing_now(action: PendingAction) -> String {
    match action {
        PendingAction::Shutdown => "⏹️ *Shutting down PC...*".to_string(),
        PendingAction::Restart => "🔄 *Restarting PC...*".to_string(),
    }
}

pub fn timer_elapsed(action: PendingAction) -> String {
    format!("⏰ *Timer elapsed*, {} the PC now...", action.progressive())
}

pub fn timer_prompt(action: PendingAction) -> String {
    format!(
        "⏰ *Set {} Timer*\n\nPlease specify the time in format:\n`1s` for seconds\n`1m` for minutes\n`1h` for hours",
        title(action)
    )
}

pub fn timer_set(confirmation: &TimerConfirmation) -> String {
    let mut text = format!(
        "✅ *{} timer set* for `{}`{}",
        title(confirmation.action),
        humanize(confirmation.duration),
        fire_time(confirmation.fire_at)
    );
    if let Some(previous) = confirmation.replaced {
        text.push_str(&format!("\nThe previous {previous} timer was cancelled."));
    }
    text
}

pub fn invalid_duration(error: &ParseDurationError) -> String {
    match error {
        ParseDurationError::InvalidUnit(unit) if unit.is_empty() => {
            "❌ *Missing time unit.* Use `s`, `m` or `h`, e.g. `10m`.".to_string()
        }
        ParseDurationError::InvalidUnit(unit) => {
            format!("❌ *Invalid time unit* `{unit}`. Use `s`, `m` or `h`, e.g. `10m`.")
        }
        ParseDurationError::InvalidNumber(number) if number.is_empty() => {
            "❌ *Missing number.* Put the amount before the unit, e.g. `1.5h`.".to_string()
        }
        ParseDurationError::InvalidNumber(number) => {
            format!("❌ *Invalid number* `{number}`. Use a non-negative number, e.g. `1.5h`.")
        }
        ParseDurationError::DurationTooLarge(_) => "❌ *That duration is too large.*".to_string(),
    }
}

pub fn active_timer(timer: &ActiveTimer) -> String {
    match timer.remaining {
        Some(remaining) => format!(
            "⏰ *Active timer:* {} in `{}`{}",
            timer.action,
            humanize(remaining),
            fire_time(timer.fire_at)
        ),
        None => format!("⏰ *Active timer:* {} (far in the future)", timer.action),
    }
}

pub fn no_active_timer() -> String {
    "ℹ️ *No active timer*".to_string()
}

pub fn timer_cancelled(action: PendingAction) -> String {
    format!("✅ *Timer cancelled successfully* ({action})")
}

pub fn nothing_to_cancel() -> String {
    "❌ *No active timer to cancel*".to_string()
}

pub fn not_a_command() -> String {
    "ℹ️ Send a command to control the PC. Use /help to list commands.".to_string()
}

pub fn unknown_command(name: &str) -> String {
    format!("❓ Unknown command `/{name}`. Use /help to list commands.")
}

pub fn unauthorized() -> String {
    "⛔ You are not authorized to control this PC.".to_string()
}
