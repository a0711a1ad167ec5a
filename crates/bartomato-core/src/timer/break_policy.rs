use super::state::BreakKind;

/// Pick the break that follows the `completed_count`-th pomodoro.
///
/// A long break follows every `long_break_interval`-th pomodoro. The interval
/// is validated as positive by [`crate::ConfigStore`]; a zero interval falls
/// back to short breaks.
pub fn next_break(completed_count: u32, long_break_interval: u32) -> BreakKind {
    match completed_count.checked_rem(long_break_interval) {
        Some(0) if completed_count > 0 => BreakKind::Long,
        _ => BreakKind::Short,
    }
}
