//! Batch commands run from the command line.

use std::io::Write;

use color_eyre::eyre::Context;

use crate::utils::state::AppState;

/// Syncs every active account's subscription status with the list.
///
/// Accounts are processed one at a time; a record is created for accounts
/// that lack one. Prints `email<TAB><TAB>status` per account and stops at
/// the first failure. Returns the number of synced accounts.
pub async fn sync_all(state: &AppState, out: &mut impl Write) -> color_eyre::Result<usize> {
    let accounts = state
        .repository
        .active_accounts()
        .await
        .wrap_err("Failed to load active accounts")?;

    for account in &accounts {
        let mut record = state
            .repository
            .get_or_create_subscription(account)
            .await
            .wrap_err_with(|| format!("Failed to load subscription for {}", account.email))?;
        record
            .sync(state, true)
            .await
            .wrap_err_with(|| format!("Failed to sync {}", account.email))?;
        writeln!(out, "{}\t\t{}", account.email, record.status)?;
    }

    tracing::info!("Synced {} accounts", accounts.len());
    Ok(accounts.len())
}
