use journal_core::Mood;

use crate::client::JournalBackend;
use crate::commands::common::{pending_notice, resolve_entry_content};
use crate::error::CliError;
use crate::store::{JournalStore, Outcome};

pub async fn run_add<B: JournalBackend>(
    store: &JournalStore<B>,
    content_parts: &[String],
    mood: Option<Mood>,
) -> Result<(), CliError> {
    let content = resolve_entry_content(content_parts)?;

    match store.create_entry(&content, mood).await? {
        Outcome::Synced(entry) => println!("{}", entry.id),
        Outcome::Queued | Outcome::Unchanged => {
            println!("{}", pending_notice(store.entry_state().await.pending));
        }
    }
    Ok(())
}
