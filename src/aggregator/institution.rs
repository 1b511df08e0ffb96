use crate::{Error, services::{AggregationService, Institution}};

/// The countries whose institutions can be linked and looked up.
pub const COUNTRY_CODES: [&str; 1] = ["US"];

/// Get the display metadata of an institution.
///
/// # Errors
///
/// Returns an [Error::Upstream] if the aggregation service call fails. The
/// error is logged before it is returned.
pub async fn get_institution(
    institution_id: &str,
    aggregator: &dyn AggregationService,
) -> Result<Institution, Error> {
    let country_codes = COUNTRY_CODES.map(str::to_owned);

    aggregator
        .get_institution(institution_id, &country_codes)
        .await
        .inspect_err(|error| {
            tracing::error!("Could not get the institution {institution_id}: {error}");
        })
}
