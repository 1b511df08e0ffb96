use crate::{
    Bank, Error, NewBank, User, encrypt_id,
    services::{
        AggregationService, DocumentStore, FundingSourceRequest, LinkTokenRequest,
        PaymentsProcessor,
    },
};

use super::COUNTRY_CODES;

/// The products a link token grants access to.
const LINK_PRODUCTS: [&str; 1] = ["auth"];
/// The language of the linking widget.
const LINK_LANGUAGE: &str = "en";
/// The payments processor that processor tokens are created for.
const PROCESSOR: &str = "dwolla";

/// Create a link token for starting the bank linking widget for `user`.
///
/// # Errors
///
/// Returns an error if the aggregation service call fails.
pub async fn create_link_token(
    user: &User,
    aggregator: &dyn AggregationService,
) -> Result<String, Error> {
    let request = LinkTokenRequest {
        client_user_id: user.id.to_string(),
        client_name: user.full_name(),
        products: LINK_PRODUCTS.map(str::to_owned).to_vec(),
        language: LINK_LANGUAGE.to_owned(),
        country_codes: COUNTRY_CODES.map(str::to_owned).to_vec(),
    };

    aggregator
        .create_link_token(&request)
        .await
        .inspect_err(|error| {
            tracing::error!("Could not create a link token for user {}: {error}", user.id);
        })
}

/// Finish linking a bank for `user`.
///
/// The public token from the linking widget is exchanged for an access
/// token. The first account of the linked item is then registered as a
/// funding source with the payments processor and a bank record is created.
///
/// The steps run in order and the first failure aborts the rest. The bank
/// record is only created once the funding source exists. Retrying after a
/// failure starts over, so it may register a second funding source.
///
/// # Errors
///
/// Returns:
/// - [Error::NoAccounts] if the linked item has no accounts,
/// - [Error::MissingFundingSource] if the payments processor did not return
///   a funding source,
/// - an upstream error if any of the services fail.
pub async fn exchange_public_token(
    public_token: &str,
    user: &User,
    aggregator: &dyn AggregationService,
    payments: &dyn PaymentsProcessor,
    documents: &dyn DocumentStore,
) -> Result<Bank, Error> {
    let exchange = aggregator.exchange_public_token(public_token).await?;

    let accounts = aggregator.get_accounts(&exchange.access_token).await?;
    let account = accounts
        .accounts
        .into_iter()
        .next()
        .ok_or(Error::NoAccounts)?;

    let processor_token = aggregator
        .create_processor_token(&exchange.access_token, &account.account_id, PROCESSOR)
        .await?;

    let funding_source_url = payments
        .add_funding_source(&FundingSourceRequest {
            customer_id: user.dwolla_customer_id.clone(),
            processor_token,
            bank_name: account.name.clone(),
        })
        .await?
        .filter(|url| !url.is_empty())
        .ok_or_else(|| {
            tracing::error!(
                "No funding source was created for account {} of user {}",
                account.account_id,
                user.id
            );
            Error::MissingFundingSource
        })?;

    let bank = documents
        .create_bank(&NewBank {
            user_id: user.id.clone(),
            bank_id: exchange.item_id,
            shareable_id: encrypt_id(&account.account_id),
            account_id: account.account_id,
            access_token: exchange.access_token,
            funding_source_url,
        })
        .await?;

    tracing::info!("User {} linked bank {}", user.id, bank.id);

    Ok(bank)
}


#[cfg(test)]
mod exchange_public_token_tests {
    use crate::{
        Error, decrypt_id,
        services::DocumentStore,
        test_utils::{FakeAggregator, FakePayments, TestBackend},
    };

    use super::exchange_public_token;

    #[tokio::test]
    async fn creates_bank_record() {
        let backend = TestBackend::new();
        let user = backend.create_user("jane@example.com").await;
        let aggregator = FakeAggregator::new()
            .with_exchange("public-1", "access-1", "item-1")
            .with_item("access-1", "acc1", 100.0, "ins_1");
        let payments = FakePayments::default();

        let bank = exchange_public_token(
            "public-1",
            &user,
            &aggregator,
            &payments,
            &backend.store,
        )
        .await
        .unwrap();

        assert_eq!(bank.user_id, user.id);
        assert_eq!(bank.bank_id, "item-1");
        assert_eq!(bank.account_id, "acc1");
        assert_eq!(bank.access_token, "access-1");
        assert_eq!(decrypt_id(&bank.shareable_id), Ok("acc1".to_owned()));
        assert_eq!(
            bank.funding_source_url,
            "https://dwolla.test/funding-sources/processor-acc1"
        );
        assert_eq!(backend.store.get_banks(&user.id).await, Ok(vec![bank]));

        let funding_requests = payments.funding_sources();
        assert_eq!(funding_requests.len(), 1);
        assert_eq!(funding_requests[0].customer_id, user.dwolla_customer_id);
        assert_eq!(funding_requests[0].processor_token, "processor-acc1");
    }

    #[tokio::test]
    async fn missing_funding_source_leaves_no_bank_record() {
        let backend = TestBackend::new();
        let user = backend.create_user("jane@example.com").await;
        let aggregator = FakeAggregator::new()
            .with_exchange("public-1", "access-1", "item-1")
            .with_item("access-1", "acc1", 100.0, "ins_1");
        let payments = FakePayments::without_funding_source();

        let result = exchange_public_token(
            "public-1",
            &user,
            &aggregator,
            &payments,
            &backend.store,
        )
        .await;

        assert_eq!(result, Err(Error::MissingFundingSource));
        assert_eq!(backend.store.get_banks(&user.id).await, Ok(vec![]));
    }

    #[tokio::test]
    async fn failed_exchange_stops_before_payments() {
        let backend = TestBackend::new();
        let user = backend.create_user("jane@example.com").await;
        let aggregator = FakeAggregator::new();
        let payments = FakePayments::default();

        let result = exchange_public_token(
            "public-unknown",
            &user,
            &aggregator,
            &payments,
            &backend.store,
        )
        .await;

        assert!(matches!(result, Err(Error::Upstream { .. })));
        assert!(payments.funding_sources().is_empty());
        assert_eq!(backend.store.get_banks(&user.id).await, Ok(vec![]));
    }
}
