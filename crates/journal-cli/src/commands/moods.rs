use journal_core::models::MoodPresentation;
use journal_core::Mood;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct MoodItem {
    pub value: &'static str,
    #[serde(flatten)]
    pub presentation: MoodPresentation,
}

pub fn mood_items() -> Vec<MoodItem> {
    Mood::ALL
        .into_iter()
        .map(|mood| MoodItem {
            value: mood.as_str(),
            presentation: mood.presentation(),
        })
        .collect()
}

pub fn run_moods(as_json: bool) -> Result<(), CliError> {
    let items = mood_items();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    for item in items {
        println!(
            "{}  {:<8} {}",
            item.presentation.emoji, item.value, item.presentation.color
        );
    }
    Ok(())
}
