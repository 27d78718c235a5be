use journal_core::search::SearchQuery;
use journal_core::Mood;

use crate::client::JournalBackend;
use crate::commands::common::{normalize_content, parse_date_bound, print_entries, DateBound};
use crate::error::CliError;
use crate::store::{JournalStore, SearchOutcome};

pub struct SearchArgs<'a> {
    pub terms: &'a [String],
    pub mood: Option<Mood>,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub as_json: bool,
}

pub fn build_search_query(args: &SearchArgs<'_>) -> Result<SearchQuery, CliError> {
    let query = SearchQuery {
        text: normalize_content(&args.terms.join(" ")),
        mood: args.mood,
        from: args
            .from
            .map(|raw| parse_date_bound(raw, DateBound::Start))
            .transpose()?,
        to: args
            .to
            .map(|raw| parse_date_bound(raw, DateBound::End))
            .transpose()?,
    };
    if query.is_unfiltered() {
        return Err(CliError::EmptySearch);
    }
    Ok(query)
}

pub async fn run_search<B: JournalBackend>(
    store: &JournalStore<B>,
    args: &SearchArgs<'_>,
) -> Result<(), CliError> {
    let query = build_search_query(args)?;

    match store.search(query).await? {
        SearchOutcome::Applied(_) => {
            let state = store.entry_state().await;
            print_entries(&state.entries, args.as_json)?;
        }
        SearchOutcome::Superseded => tracing::debug!("Search superseded"),
    }
    Ok(())
}
