mod errors;
mod fine_service;
mod loan_listing;
mod payment_settlement;
mod transaction_summary;

pub use errors::{FineApplicationError, Result};
pub use fine_service::{ServiceDependencies, get_loan_fine, get_member_ledger, return_book};
pub use loan_listing::{LoanWithFine, list_loans, list_member_loans};
pub use payment_settlement::settle_payment;
pub use transaction_summary::summarize_transactions;
