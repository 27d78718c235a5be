use crate::client::JournalBackend;
use crate::commands::common::{format_entry_detail, parse_entry_id};
use crate::error::CliError;
use crate::store::JournalStore;

pub async fn run_show<B: JournalBackend>(store: &JournalStore<B>, id: &str) -> Result<(), CliError> {
    let id = parse_entry_id(id)?;
    let entry = store.fetch_entry(&id).await?;
    println!("{}", format_entry_detail(&entry));
    Ok(())
}
