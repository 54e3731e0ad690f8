use crate::domain::models::{TimeRange, UserPreferences};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferencesIntent {
    SetProductiveHours(TimeRange),
    SetSleepHours(TimeRange),
    AddBlockedHours(TimeRange),
    RemoveBlockedHours(usize),
    UpdateBlockedHours { index: usize, range: TimeRange },
    UpdateAll(PreferencesPatch),
}

impl PreferencesIntent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetProductiveHours(_) => "set_productive_hours",
            Self::SetSleepHours(_) => "set_sleep_hours",
            Self::AddBlockedHours(_) => "add_blocked_hours",
            Self::RemoveBlockedHours(_) => "remove_blocked_hours",
            Self::UpdateBlockedHours { .. } => "update_blocked_hours",
            Self::UpdateAll(_) => "update_all_preferences",
        }
    }
}

/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PreferencesPatch {
    pub productive_hours: Option<TimeRange>,
    pub sleep_hours: Option<TimeRange>,
    pub blocked_hours: Option<Vec<TimeRange>>,
}

/// Ranges are stored as given; callers gate them with `is_overnight_valid` first.
pub fn reduce(mut state: UserPreferences, intent: PreferencesIntent) -> UserPreferences {
    match intent {
        PreferencesIntent::SetProductiveHours(range) => state.productive_hours = range,
        PreferencesIntent::SetSleepHours(range) => state.sleep_hours = range,
        PreferencesIntent::AddBlockedHours(range) => state.blocked_hours.push(range),
        PreferencesIntent::RemoveBlockedHours(index) => {
            if index < state.blocked_hours.len() {
                state.blocked_hours.remove(index);
            }
        }
        PreferencesIntent::UpdateBlockedHours { index, range } => {
            if let Some(slot) = state.blocked_hours.get_mut(index) {
                *slot = range;
            }
        }
        PreferencesIntent::UpdateAll(patch) => {
            if let Some(range) = patch.productive_hours {
                state.productive_hours = range;
            }
            if let Some(range) = patch.sleep_hours {
                state.sleep_hours = range;
            }
            if let Some(ranges) = patch.blocked_hours {
                state.blocked_hours = ranges;
            }
        }
    }
    state
}
