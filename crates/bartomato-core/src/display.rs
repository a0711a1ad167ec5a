//! Human-facing renderings of a [`TimerStatus`].

use crate::timer::{TimerMode, TimerPhase, TimerStatus};

/// `MM:SS`. Minutes are not wrapped into hours.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// `XhrYY`, e.g. `0hr25` or `3hr10`.
pub fn format_minutes(total_minutes: u32) -> String {
    format!("{}hr{:02}", total_minutes / 60, total_minutes % 60)
}

/// Inverse of [`format_minutes`]; accepts surrounding whitespace only.
pub fn parse_minutes(s: &str) -> Option<u32> {
    let (hours, mins) = s.trim().split_once("hr")?;
    if hours.is_empty() || mins.is_empty() {
        return None;
    }
    if !hours.bytes().chain(mins.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let mins: u32 = mins.parse().ok()?;
    hours.checked_mul(60)?.checked_add(mins)
}

/// The main clock text: `+MM:SS` in overtime, else the remaining time, else
/// the elapsed time.
pub fn formatted_time(status: &TimerStatus) -> String {
    if status.overtime_secs > 0 {
        return format!("+{}", format_clock(status.overtime_secs));
    }
    match status.remaining_secs {
        Some(remaining) => format_clock(remaining),
        None => format_clock(status.elapsed_secs),
    }
}

/// Fraction of the allotted duration used, in `[0, 1]`.
///
/// Always 0 for Idle and stopwatch runs, 1 once in overtime.
pub fn progress(status: &TimerStatus) -> f64 {
    if status.phase == TimerPhase::Idle || status.mode == TimerMode::Stopwatch {
        return 0.0;
    }
    if status.overtime_secs > 0 {
        return 1.0;
    }
    let Some(remaining) = status.remaining_secs else {
        return 0.0;
    };
    let total = status.elapsed_secs.saturating_add(remaining);
    if total == 0 {
        return 0.0;
    }
    (status.elapsed_secs as f64 / total as f64).clamp(0.0, 1.0)
}

/// Menu-bar text. Empty while Idle; every other phase starts with a space.
pub fn tray_title(status: &TimerStatus) -> String {
    let clock = || match (status.mode, status.remaining_secs) {
        (TimerMode::Pomodoro, _) if status.overtime_secs > 0 => {
            Some(format!("+{}", format_clock(status.overtime_secs)))
        }
        (TimerMode::Pomodoro, Some(remaining)) => Some(format_clock(remaining)),
        (TimerMode::Pomodoro, None) => None,
        (TimerMode::Stopwatch, _) => Some(format_clock(status.elapsed_secs)),
    };

    let prefix = match status.phase {
        TimerPhase::Idle => return String::new(),
        TimerPhase::Running => "",
        TimerPhase::Paused => "⏸",
        TimerPhase::ShortBreak | TimerPhase::LongBreak => "☕",
    };
    let text = if status.phase.is_break() {
        status.remaining_secs.map(format_clock)
    } else {
        clock()
    };

    match (prefix.is_empty(), text) {
        (true, Some(text)) => format!(" {text}"),
        (true, None) => String::new(),
        (false, Some(text)) => format!(" {prefix} {text}"),
        (false, None) => format!(" {prefix}"),
    }
}
