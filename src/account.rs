//! The live account data shown to the user.
//!
//! Accounts are never stored: they are rebuilt from the aggregation service
//! on every request.

use crate::{DocumentId, Transaction};

/// A bank account with its live balances.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The aggregation service's ID for the account.
    pub id: String,
    /// The amount that can be spent right now, if the bank reports it.
    pub available_balance: Option<f64>,
    /// The current balance, including pending transactions.
    pub current_balance: f64,
    /// The ID of the institution that holds the account.
    pub institution_id: String,
    /// The display name of the account.
    pub name: String,
    /// The name the institution gives the account, if any.
    pub official_name: Option<String>,
    /// The last few digits of the account number.
    pub mask: String,
    /// The account type, e.g. "depository".
    pub account_type: String,
    /// The account subtype, e.g. "checking".
    pub subtype: String,
    /// The ID of the bank record this account was loaded from.
    pub appwrite_item_id: DocumentId,
    /// The encoded account ID the owner can share to receive transfers.
    pub shareable_id: String,
}

/// Every linked account of a user with totals across all of them.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountsSummary {
    /// One account per linked bank.
    pub accounts: Vec<Account>,
    /// The number of linked banks.
    pub total_banks: usize,
    /// The sum of the current balances of `accounts`.
    pub total_current_balance: f64,
}

impl AccountsSummary {
    /// Build a summary and compute its totals from `accounts`.
    pub fn new(accounts: Vec<Account>) -> Self {
        let total_banks = accounts.len();
        let total_current_balance = accounts
            .iter()
            .map(|account| account.current_balance)
            .sum();

        Self {
            accounts,
            total_banks,
            total_current_balance,
        }
    }
}

/// A single account with its merged transaction history.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountDetail {
    /// The account.
    pub account: Account,
    /// Synced and transfer transactions, newest first.
    pub transactions: Vec<Transaction>,
}

#[cfg(test)]
mod accounts_summary_tests {
    use crate::DocumentId;

    use super::{Account, AccountsSummary};

    fn account(id: &str, current_balance: f64) -> Account {
        Account {
            id: id.to_owned(),
            available_balance: Some(current_balance),
            current_balance,
            institution_id: "ins_1".to_owned(),
            name: "Checking".to_owned(),
            official_name: None,
            mask: "0000".to_owned(),
            account_type: "depository".to_owned(),
            subtype: "checking".to_owned(),
            appwrite_item_id: DocumentId::new_unchecked("bank1"),
            shareable_id: "c2hhcmU".to_owned(),
        }
    }

    #[test]
    fn totals_sum_current_balances() {
        let summary = AccountsSummary::new(vec![account("a", 100.5), account("b", -20.25)]);

        assert_eq!(summary.total_banks, 2);
        assert_eq!(summary.total_current_balance, 80.25);
    }

    #[test]
    fn empty_summary_has_zero_totals() {
        let summary = AccountsSummary::new(vec![]);

        assert!(summary.accounts.is_empty());
        assert_eq!(summary.total_banks, 0);
        assert_eq!(summary.total_current_balance, 0.0);
    }
}
