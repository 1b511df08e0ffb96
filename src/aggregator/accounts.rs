use futures::future::try_join_all;

use crate::{
    Account, AccountDetail, AccountsSummary, Bank, DocumentId, Error, Service,
    services::{AggregatedAccount, AggregationService, DocumentStore},
    transaction::merge_transactions,
};

use super::{get_institution, get_transactions, get_transfer_transactions};

fn shape_account(bank: &Bank, account: AggregatedAccount, institution_id: String) -> Account {
    Account {
        id: account.account_id,
        available_balance: account.balances.available,
        current_balance: account.balances.current.unwrap_or_default(),
        institution_id,
        name: account.name,
        official_name: account.official_name,
        mask: account.mask.unwrap_or_default(),
        account_type: account.account_type,
        subtype: account.subtype.unwrap_or_default(),
        appwrite_item_id: bank.id.clone(),
        shareable_id: bank.shareable_id.clone(),
    }
}

/// Load the first account of the item linked by `bank` together with its
/// institution.
async fn load_account(bank: &Bank, aggregator: &dyn AggregationService) -> Result<Account, Error> {
    let response = aggregator.get_accounts(&bank.access_token).await?;

    let institution_id = response.item.institution_id.ok_or_else(|| {
        Error::upstream(
            Service::Aggregation,
            format!("item {} has no institution", response.item.item_id),
        )
    })?;
    let account = response
        .accounts
        .into_iter()
        .next()
        .ok_or(Error::NoAccounts)?;

    let institution = get_institution(&institution_id, aggregator).await?;

    Ok(shape_account(bank, account, institution.institution_id))
}

/// Get the live account of every bank the user has linked, with the number
/// of banks and the sum of their current balances.
///
/// The banks are loaded concurrently. If any bank fails to load the whole
/// summary fails with that error. A user with no linked banks gets an empty
/// summary.
///
/// `user_id` is the ID of the user's profile document.
///
/// # Errors
///
/// Returns an error if the document store fails or any bank's account or
/// institution cannot be loaded.
pub async fn get_accounts(
    user_id: &DocumentId,
    documents: &dyn DocumentStore,
    aggregator: &dyn AggregationService,
) -> Result<AccountsSummary, Error> {
    let banks = documents.get_banks(user_id).await?;

    let accounts = try_join_all(banks.iter().map(|bank| load_account(bank, aggregator)))
        .await
        .inspect_err(|error| {
            tracing::error!("Could not load the accounts of user {user_id}: {error}");
        })?;

    Ok(AccountsSummary::new(accounts))
}

/// Get the live account of one linked bank and its transactions.
///
/// The transactions merge the aggregation service's sync feed with the
/// transfers recorded for the bank, newest first.
///
/// `bank_id` is the raw ID of the bank document, e.g. from a query string.
///
/// # Errors
///
/// Returns:
/// - [Error::InvalidDocumentId] if `bank_id` is not a valid document ID. The
///   document store is not called in this case.
/// - [Error::NotFound] if there is no bank with the ID.
/// - an upstream error if any of the services fail.
pub async fn get_account(
    bank_id: &str,
    documents: &dyn DocumentStore,
    aggregator: &dyn AggregationService,
) -> Result<AccountDetail, Error> {
    let bank_id = DocumentId::new(bank_id)?;
    let bank = documents.get_bank(&bank_id).await?;

    let (account, transfers, synced) = tokio::try_join!(
        load_account(&bank, aggregator),
        get_transfer_transactions(&bank, documents),
        get_transactions(&bank.access_token, aggregator),
    )
    .inspect_err(|error| tracing::error!("Could not load bank {bank_id}: {error}"))?;

    Ok(AccountDetail {
        account,
        transactions: merge_transactions(synced, transfers),
    })
}


#[cfg(test)]
mod get_account_tests {
    use time::macros::date;

    use crate::{
        Direction, Error, TransactionSource,
        services::{SyncPage, SyncedTransaction},
        test_utils::{FakeAggregator, TestBackend},
    };

    use super::get_account;

    #[tokio::test]
    async fn merges_synced_and_transfer_transactions() {
        let backend = TestBackend::new();
        let jane = backend.create_user("jane@example.com").await;
        let bob = backend.create_user("bob@example.com").await;
        let jane_bank = backend.create_bank(&jane, "acc1").await;
        let bob_bank = backend.create_bank(&bob, "acc2").await;
        backend.create_transfer(&jane_bank, &bob_bank, 40.0).await;
        let aggregator = FakeAggregator::new()
            .with_item(&jane_bank.access_token, "acc1", 500.0, "ins_1")
            .with_sync_pages(
                &jane_bank.access_token,
                vec![SyncPage {
                    added: vec![SyncedTransaction {
                        transaction_id: "synced1".to_owned(),
                        account_id: "acc1".to_owned(),
                        name: "Coffee".to_owned(),
                        amount: 4.5,
                        date: date!(2020 - 01 - 01),
                        pending: false,
                        payment_channel: "in store".to_owned(),
                        category: None,
                        logo_url: None,
                    }],
                    next_cursor: "c1".to_owned(),
                    has_more: false,
                }],
            );

        let detail = get_account(jane_bank.id.as_str(), &backend.store, &aggregator)
            .await
            .unwrap();

        assert_eq!(detail.account.id, "acc1");
        assert_eq!(detail.account.current_balance, 500.0);
        assert_eq!(detail.transactions.len(), 2);
        // The transfer was recorded just now, so it is newer than the synced item.
        assert_eq!(detail.transactions[0].source, TransactionSource::Transfer);
        assert_eq!(detail.transactions[0].direction, Direction::Debit);
        assert_eq!(detail.transactions[1].id, "synced1");
    }

    #[tokio::test]
    async fn invalid_bank_id_is_rejected() {
        let backend = TestBackend::new();
        let aggregator = FakeAggregator::new();

        let result = get_account("_not-valid", &backend.store, &aggregator).await;

        assert_eq!(
            result,
            Err(Error::InvalidDocumentId("_not-valid".to_owned()))
        );
    }

    #[tokio::test]
    async fn missing_bank_is_not_found() {
        let backend = TestBackend::new();
        let aggregator = FakeAggregator::new();

        let result = get_account("12345", &backend.store, &aggregator).await;

        assert_eq!(result, Err(Error::NotFound));
    }
}
