use journal_core::validation::EntryPatch;
use journal_core::Mood;

use crate::client::JournalBackend;
use crate::commands::common::{parse_entry_id, pending_notice};
use crate::error::CliError;
use crate::store::{JournalStore, Outcome};

pub async fn run_edit<B: JournalBackend>(
    store: &JournalStore<B>,
    id: &str,
    content: Option<String>,
    mood: Option<Mood>,
    clear_mood: bool,
) -> Result<(), CliError> {
    let id = parse_entry_id(id)?;
    if content.is_none() && mood.is_none() && !clear_mood {
        return Err(CliError::EmptyEdit);
    }

    // The current entry lets an unchanged mood skip the request. Entries still
    // waiting in the offline queue are unknown to the API, so edit them anyway.
    match store.fetch_entry(&id).await {
        Ok(_) => {}
        Err(CliError::Client(error)) if error.is_transport() || error.is_not_found() => {}
        Err(error) => return Err(error),
    }

    let outcome = match (content, mood, clear_mood) {
        (None, Some(mood), _) => store.set_mood(&id, mood).await?,
        (None, None, true) => store.clear_mood(&id).await?,
        (content, mood, clear_mood) => {
            let patch = EntryPatch {
                content,
                mood: if clear_mood { Some(None) } else { mood.map(Some) },
            };
            store.update_entry(&id, patch).await?
        }
    };

    match outcome {
        Outcome::Synced(entry) => println!("{}", entry.id),
        Outcome::Queued => println!("{}", pending_notice(store.entry_state().await.pending)),
        Outcome::Unchanged => println!("Nothing changed"),
    }
    Ok(())
}
