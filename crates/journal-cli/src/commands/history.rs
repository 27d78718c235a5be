use crate::client::JournalBackend;
use crate::error::CliError;
use crate::store::JournalStore;

pub async fn run_history<B: JournalBackend>(store: &JournalStore<B>) -> Result<(), CliError> {
    let terms = store.recent_searches().await;
    if terms.is_empty() {
        println!("No recent searches");
    }
    for term in terms {
        println!("{term}");
    }
    Ok(())
}
