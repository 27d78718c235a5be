//! Data models for Journal

mod entry;
mod insight;
mod mood;
mod preferences;
mod profile;

pub use entry::{Entry, EntryId};
pub use insight::AiInsight;
pub use mood::{Mood, MoodPresentation, MoodSelection, SelectionChange};
pub use preferences::{validate_reminder_time, PreferencesPatch, ThemeMode, UserPreferences};
pub use profile::{ProfilePatch, UserProfile};
