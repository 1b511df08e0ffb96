//! Sending money between linked banks.
//!
//! This module contains everything related to transfers:
//! - The `Transfer` model and the flow that sends and records a transfer
//! - The transfer form page and the endpoint it posts to

mod core;
mod create_endpoint;
mod create_page;

pub use core::{
    NewTransfer, TRANSFER_CATEGORY, TRANSFER_CHANNEL, Transfer, TransferDetails, parse_amount,
    transfer_funds,
};
pub use create_endpoint::create_transfer_endpoint;
pub use create_page::get_payment_transfer_page;
