use crate::client::JournalBackend;
use crate::error::CliError;
use crate::store::JournalStore;

pub async fn run_sync<B: JournalBackend>(store: &JournalStore<B>) -> Result<(), CliError> {
    let report = store.flush_pending().await?;

    if report.applied == 0 && report.dropped == 0 && report.remaining == 0 {
        println!("Nothing to sync");
        return Ok(());
    }
    println!(
        "Synced {} change(s), dropped {}, {} still pending",
        report.applied, report.dropped, report.remaining
    );
    if report.remaining > 0 {
        if let Some(error) = store.entry_state().await.error {
            println!("{error}");
        }
    }
    Ok(())
}
