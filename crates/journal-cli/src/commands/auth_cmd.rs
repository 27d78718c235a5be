use crate::client::JournalBackend;
use crate::error::CliError;
use crate::store::JournalStore;

pub async fn run_signup<B: JournalBackend>(
    store: &JournalStore<B>,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    let response = store.sign_up(email, password).await?;
    if response.confirmation_required {
        println!("Check {} for a confirmation link, then run `journal login`", email.trim());
    } else {
        println!("Signed up and signed in as {}", email.trim());
    }
    Ok(())
}

pub async fn run_login<B: JournalBackend>(
    store: &JournalStore<B>,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    let session = store.sign_in(email, password).await?;
    println!(
        "Signed in as {}",
        session.user.email.as_deref().unwrap_or(session.user.id.as_str())
    );

    let pending = store.entry_state().await.pending;
    if pending > 0 {
        println!("{pending} offline change(s) waiting; run `journal sync`");
    }
    Ok(())
}

pub async fn run_logout<B: JournalBackend>(store: &JournalStore<B>) -> Result<(), CliError> {
    store.sign_out().await?;
    println!("Signed out");
    Ok(())
}

pub async fn run_reset_password<B: JournalBackend>(
    store: &JournalStore<B>,
    email: &str,
    redirect_to: Option<String>,
) -> Result<(), CliError> {
    store.reset_password(email, redirect_to).await?;
    println!(
        "If an account exists for {}, a reset link is on its way",
        email.trim()
    );
    Ok(())
}
