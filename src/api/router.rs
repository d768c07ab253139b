use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_payment, get_loan_fine, get_member_fines, get_transaction_summary,
    list_loans, list_member_loans, return_book,
};

/// Creates the API router with all fine endpoints
///
/// Query endpoints:
/// - GET /members/:member_id/fines - Fine ledger of a member
/// - GET /members/:member_id/loans - All loans of a member, paid ones included
/// - GET /loans?status=active|overdue|returned - Loan listing (staff)
/// - GET /loans/:loan_id/fine - Fine of a single loan
/// - GET /loans/summary - Transaction summary (staff)
///
/// Command endpoints:
/// - POST /loans/:loan_id/return - Return a book (staff)
/// - POST /payments - Settle one fine or all fines of a member
///
/// Every route except /health requires the session headers.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Query endpoints
        .route("/members/:member_id/fines", get(get_member_fines))
        .route("/members/:member_id/loans", get(list_member_loans))
        .route("/loans", get(list_loans))
        .route("/loans/summary", get(get_transaction_summary))
        .route("/loans/:loan_id/fine", get(get_loan_fine))
        // Command endpoints
        .route("/loans/:loan_id/return", post(return_book))
        .route("/payments", post(create_payment))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
