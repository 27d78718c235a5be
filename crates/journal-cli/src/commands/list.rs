use crate::client::JournalBackend;
use crate::commands::common::print_entries;
use crate::error::CliError;
use crate::store::JournalStore;

pub async fn run_list<B: JournalBackend>(
    store: &JournalStore<B>,
    cursor: Option<String>,
    as_json: bool,
) -> Result<(), CliError> {
    match cursor {
        Some(cursor) => store.load_from(cursor).await?,
        None => store.load_entries().await?,
    };

    let state = store.entry_state().await;
    print_entries(&state.entries, as_json)?;
    if !as_json {
        if let Some(cursor) = state.next_cursor {
            println!("\nMore: journal list --cursor {cursor}");
        }
    }
    Ok(())
}
