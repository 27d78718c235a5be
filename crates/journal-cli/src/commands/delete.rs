use crate::client::JournalBackend;
use crate::commands::common::{parse_entry_id, pending_notice};
use crate::error::CliError;
use crate::store::{JournalStore, Outcome};

pub async fn run_delete<B: JournalBackend>(
    store: &JournalStore<B>,
    id: &str,
) -> Result<(), CliError> {
    let id = parse_entry_id(id)?;

    match store.delete_entry(&id).await? {
        Outcome::Synced(()) | Outcome::Unchanged => println!("{id}"),
        Outcome::Queued => println!("{}", pending_notice(store.entry_state().await.pending)),
    }
    Ok(())
}
