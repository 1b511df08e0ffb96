use crate::{
    Bank, DocumentId, Error, Transfer,
    services::{AggregationService, DocumentStore, SyncedTransaction},
    transaction::{Direction, Transaction, TransactionSource},
};

/// The most pages of the transaction sync feed that are read for one bank.
///
/// The feed is expected to finish well within this many pages. Reaching the
/// limit means the aggregation service keeps reporting more pages.
pub const MAX_SYNC_PAGES: usize = 50;

impl From<SyncedTransaction> for Transaction {
    fn from(synced: SyncedTransaction) -> Self {
        // Positive amounts are money leaving the account.
        let direction = if synced.amount > 0.0 {
            Direction::Debit
        } else {
            Direction::Credit
        };

        Transaction {
            id: synced.transaction_id,
            name: synced.name,
            amount: synced.amount,
            date: synced.date.midnight().assume_utc(),
            category: synced
                .category
                .and_then(|categories| categories.into_iter().next())
                .unwrap_or_default(),
            payment_channel: synced.payment_channel,
            direction,
            pending: synced.pending,
            image: synced.logo_url,
            source: TransactionSource::Synced,
        }
    }
}

/// Shape a transfer as a transaction on the bank `viewed_bank_id`.
///
/// The transfer is a debit if it was sent from the viewed bank, otherwise it
/// is a credit.
pub fn transfer_to_transaction(transfer: Transfer, viewed_bank_id: &DocumentId) -> Transaction {
    let direction = if transfer.sender_bank_id == *viewed_bank_id {
        Direction::Debit
    } else {
        Direction::Credit
    };

    Transaction {
        id: transfer.id.to_string(),
        name: transfer.name,
        amount: transfer.amount,
        date: transfer.created_at,
        category: transfer.category,
        payment_channel: transfer.channel,
        direction,
        pending: false,
        image: None,
        source: TransactionSource::Transfer,
    }
}

/// Get the transfers `bank` sent or received as transactions.
///
/// # Errors
///
/// Returns an error if the document store fails.
pub async fn get_transfer_transactions(
    bank: &Bank,
    documents: &dyn DocumentStore,
) -> Result<Vec<Transaction>, Error> {
    let transfers = documents.get_transfers_by_bank(&bank.id).await?;

    Ok(transfers
        .into_iter()
        .map(|transfer| transfer_to_transaction(transfer, &bank.id))
        .collect())
}

/// Read every page of the transaction sync feed for the item that
/// `access_token` belongs to.
///
/// Each request passes the cursor returned with the previous page and the
/// transactions of all pages are kept.
///
/// # Errors
///
/// Returns:
/// - [Error::SyncPageLimit] if the feed still has more pages after
///   [MAX_SYNC_PAGES] pages,
/// - [Error::Upstream] if a sync request fails.
pub async fn get_transactions(
    access_token: &str,
    aggregator: &dyn AggregationService,
) -> Result<Vec<Transaction>, Error> {
    let mut transactions = Vec::new();
    let mut cursor: Option<String> = None;

    for page_number in 1..=MAX_SYNC_PAGES {
        let page = aggregator
            .sync_transactions(access_token, cursor.as_deref())
            .await?;
        tracing::debug!(
            "Sync page {page_number} added {} transactions, has_more={}",
            page.added.len(),
            page.has_more
        );

        transactions.extend(page.added.into_iter().map(Transaction::from));

        if !page.has_more {
            return Ok(transactions);
        }

        cursor = Some(page.next_cursor);
    }

    tracing::error!(
        "Transaction sync still had more pages after {MAX_SYNC_PAGES} pages, giving up"
    );
    Err(Error::SyncPageLimit(MAX_SYNC_PAGES))
}


#[cfg(test)]
mod transfer_transaction_tests {
    use time::macros::datetime;

    use crate::{
        Direction, DocumentId, Transfer, TransactionSource,
        test_utils::TestBackend,
    };

    use super::{get_transfer_transactions, transfer_to_transaction};

    fn transfer(sender_bank_id: &str, receiver_bank_id: &str) -> Transfer {
        Transfer {
            id: DocumentId::new_unchecked("t1"),
            name: "Rent".to_owned(),
            amount: 100.0,
            channel: "online".to_owned(),
            category: "Transfer".to_owned(),
            sender_id: DocumentId::new_unchecked("alice"),
            sender_bank_id: DocumentId::new_unchecked(sender_bank_id),
            receiver_id: DocumentId::new_unchecked("bob"),
            receiver_bank_id: DocumentId::new_unchecked(receiver_bank_id),
            email: "bob@example.com".to_owned(),
            created_at: datetime!(2024-03-03 14:30 UTC),
        }
    }

    #[test]
    fn sender_bank_sees_debit() {
        let transaction =
            transfer_to_transaction(transfer("bank1", "bank2"), &DocumentId::new_unchecked("bank1"));

        assert_eq!(transaction.direction, Direction::Debit);
        assert_eq!(transaction.source, TransactionSource::Transfer);
        assert_eq!(transaction.date, datetime!(2024-03-03 14:30 UTC));
    }

    #[test]
    fn receiver_bank_sees_credit() {
        let transaction =
            transfer_to_transaction(transfer("bank1", "bank2"), &DocumentId::new_unchecked("bank2"));

        assert_eq!(transaction.direction, Direction::Credit);
    }

    #[tokio::test]
    async fn loads_transfers_of_bank() {
        let backend = TestBackend::new();
        let alice = backend.create_user("alice@example.com").await;
        let bob = backend.create_user("bob@example.com").await;
        let alice_bank = backend.create_bank(&alice, "acc_alice").await;
        let bob_bank = backend.create_bank(&bob, "acc_bob").await;
        backend.create_transfer(&alice_bank, &bob_bank, 25.0).await;

        let sent = get_transfer_transactions(&alice_bank, &backend.store)
            .await
            .unwrap();
        let received = get_transfer_transactions(&bob_bank, &backend.store)
            .await
            .unwrap();

        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].direction, Direction::Debit);
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].direction, Direction::Credit);
    }
}
