//! Mood model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Emotional state tagged on a journal entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Calm,
    Neutral,
    Sad,
    Anxious,
    Angry,
}

/// How a mood is rendered in list, detail, and editor views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MoodPresentation {
    pub emoji: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

impl Mood {
    /// Every mood, in picker order.
    pub const ALL: [Self; 6] = [
        Self::Happy,
        Self::Calm,
        Self::Neutral,
        Self::Sad,
        Self::Anxious,
        Self::Angry,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Calm => "calm",
            Self::Neutral => "neutral",
            Self::Sad => "sad",
            Self::Anxious => "anxious",
            Self::Angry => "angry",
        }
    }

    pub const fn presentation(self) -> MoodPresentation {
        match self {
            Self::Happy => MoodPresentation {
                emoji: "😊",
                label: "Happy",
                color: "#FACC15",
            },
            Self::Calm => MoodPresentation {
                emoji: "😌",
                label: "Calm",
                color: "#34D399",
            },
            Self::Neutral => MoodPresentation {
                emoji: "😐",
                label: "Neutral",
                color: "#9CA3AF",
            },
            Self::Sad => MoodPresentation {
                emoji: "😢",
                label: "Sad",
                color: "#60A5FA",
            },
            Self::Anxious => MoodPresentation {
                emoji: "😰",
                label: "Anxious",
                color: "#A78BFA",
            },
            Self::Angry => MoodPresentation {
                emoji: "😠",
                label: "Angry",
                color: "#F87171",
            },
        }
    }

    fn allowed_values() -> String {
        Self::ALL
            .iter()
            .map(|mood| mood.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mood| mood.as_str() == s)
            .ok_or_else(|| {
                Error::validation(
                    "mood",
                    format!(
                        "`{}` is not a mood; expected one of: {}",
                        s,
                        Self::allowed_values()
                    ),
                )
            })
    }
}

/// Outcome of a mood picker interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    Changed,
    Unchanged,
}

/// Mood picker state for an entry being edited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoodSelection {
    current: Option<Mood>,
}

impl MoodSelection {
    pub const fn new(current: Option<Mood>) -> Self {
        Self { current }
    }

    pub const fn current(&self) -> Option<Mood> {
        self.current
    }

    /// Selecting the mood that is already selected leaves it in place.
    pub fn select(&mut self, mood: Mood) -> SelectionChange {
        if self.current == Some(mood) {
            return SelectionChange::Unchanged;
        }
        self.current = Some(mood);
        SelectionChange::Changed
    }

    pub fn clear(&mut self) -> SelectionChange {
        if self.current.take().is_some() {
            SelectionChange::Changed
        } else {
            SelectionChange::Unchanged
        }
    }
}
