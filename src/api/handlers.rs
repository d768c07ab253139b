use crate::application::fine::{
    FineApplicationError, LoanWithFine, ServiceDependencies,
    get_loan_fine as execute_get_loan_fine, get_member_ledger as execute_get_member_ledger,
    list_loans as execute_list_loans, list_member_loans as execute_list_member_loans,
    return_book as execute_return_book, settle_payment as execute_settle_payment,
    summarize_transactions as execute_summarize,
};
use crate::domain::{LoanId, MemberId, commands::ReturnBook};
use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    session::Session,
    types::{
        BookReturnedResponse, FineLedgerResponse, ListLoansQuery, LoanFineResponse,
        PaymentReceiptResponse, PaymentRequest, TransactionSummaryResponse,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /members/:member_id/fines - 会員の罰金台帳
///
/// 未払いの罰金一覧、合計額、新たな貸出が可能かどうかを返す。
/// 会員本人または職員のみ参照可能。
pub async fn get_member_fines(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(member_id): Path<Uuid>,
) -> Result<Json<FineLedgerResponse>, ApiError> {
    let member_id = MemberId::from_uuid(member_id);
    session.authorize_member(member_id)?;

    let ledger = execute_get_member_ledger(&state.service_deps, member_id, Utc::now()).await?;

    Ok(Json(FineLedgerResponse::from(ledger)))
}

/// GET /members/:member_id/loans - 会員の貸出一覧
///
/// 返却済み・支払済みの貸出も含む。会員本人または職員のみ参照可能。
pub async fn list_member_loans(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(member_id): Path<Uuid>,
) -> Result<Json<Vec<LoanFineResponse>>, ApiError> {
    let member_id = MemberId::from_uuid(member_id);
    session.authorize_member(member_id)?;

    let loans = execute_list_member_loans(&state.service_deps, member_id, Utc::now()).await?;

    Ok(Json(to_loan_responses(loans)))
}

/// GET /loans?status=active|overdue|returned - 貸出一覧（職員のみ）
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
    session: Session,
    query: Result<Query<ListLoansQuery>, QueryRejection>,
) -> Result<Json<Vec<LoanFineResponse>>, ApiError> {
    session.require_staff()?;
    let Query(query) = query?;

    let loans = execute_list_loans(&state.service_deps, query.status, Utc::now()).await?;

    Ok(Json(to_loan_responses(loans)))
}

fn to_loan_responses(loans: Vec<LoanWithFine>) -> Vec<LoanFineResponse> {
    loans
        .into_iter()
        .map(|(loan, entry)| LoanFineResponse::new(&loan, entry))
        .collect()
}

/// GET /loans/:loan_id/fine - 1件の貸出の罰金
///
/// 支払済みの罰金も状態 paid として返す。
/// 他の会員の貸出は存在しない貸出と同じく 404 になる。
pub async fn get_loan_fine(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanFineResponse>, ApiError> {
    let (loan, entry) =
        execute_get_loan_fine(&state.service_deps, LoanId::from_uuid(loan_id), Utc::now())
            .await?;
    if !session.can_access(loan.member_id) {
        return Err(FineApplicationError::LoanNotFound.into());
    }

    Ok(Json(LoanFineResponse::new(&loan, entry)))
}

/// GET /loans/summary - 貸出全体の集計（職員のみ）
pub async fn get_transaction_summary(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<TransactionSummaryResponse>, ApiError> {
    session.require_staff()?;

    let summary = execute_summarize(&state.service_deps, Utc::now()).await?;

    Ok(Json(TransactionSummaryResponse::from(summary)))
}

// ============================================================================
// Command handlers (POST)
// ============================================================================

/// POST /loans/:loan_id/return - 書籍を返却（職員のみ）
///
/// 強制されるビジネスルール:
/// - 貸出が存在すること
/// - 既に返却済みでないこと
/// - 延滞中の貸出も返却可能。返却時点の罰金額を返す
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(loan_id): Path<Uuid>,
) -> Result<(StatusCode, Json<BookReturnedResponse>), ApiError> {
    session.require_staff()?;

    let cmd = ReturnBook {
        loan_id: LoanId::from_uuid(loan_id),
        returned_at: Utc::now(),
    };

    let event = execute_return_book(&state.service_deps, cmd).await?;

    Ok((StatusCode::OK, Json(BookReturnedResponse::from(event))))
}

/// POST /payments - 罰金を精算
///
/// 強制されるビジネスルール:
/// - 会員本人または職員であること
/// - 支払額が対象の罰金額と完全に一致すること
/// - loan_id 省略時は会員の未払い罰金をすべて精算する
/// - 他の会員の貸出は存在しない貸出と同じく 404 になる
///
/// 本文を解釈できない場合は 400 INVALID_REQUEST を返す。
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PaymentReceiptResponse>), ApiError> {
    let Json(req) = payload?;
    session.authorize_member(MemberId::from_uuid(req.member_id))?;

    let cmd = req.to_command(Utc::now());
    let event = execute_settle_payment(&state.service_deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(PaymentReceiptResponse::from(event))))
}
