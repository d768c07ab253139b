use crate::domain::{
    loan::{Loan, LoanRecord},
    value_objects::{BookId, LoanId, MemberId},
};
use crate::ports::loan_repository::{LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

const SELECT_LOANS: &str = r#"
    SELECT
        loan_id,
        member_id,
        book_id,
        title,
        author,
        issue_date,
        due_date,
        return_date,
        fine_paid
    FROM loans
"#;

/// Convert a PostgreSQL row into a validated Loan
///
/// A row whose due_date precedes its issue_date is reported as invalid data
/// rather than silently accepted.
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let record = LoanRecord {
        loan_id: LoanId::from_uuid(row.try_get("loan_id")?),
        member_id: MemberId::from_uuid(row.try_get("member_id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        title: row.try_get("title")?,
        author: row.try_get("author")?,
        issue_date: row.try_get("issue_date")?,
        due_date: row.try_get("due_date")?,
        return_date: row.try_get("return_date")?,
        fine_paid: row.try_get("fine_paid")?,
    };

    let loan_id = record.loan_id;
    Loan::try_from(record).map_err(|e| {
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("invalid loan {}: {:?}", loan_id.value(), e),
        )) as Box<dyn std::error::Error + Send + Sync>
    })
}

/// PostgreSQL implementation of LoanRepository
pub struct LoanRepository {
    pool: PgPool,
}

impl LoanRepository {
    /// Create a new LoanRepository with a PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    /// Insert a new loan
    ///
    /// An existing row is left untouched; returns and payments only go
    /// through the conditional updates below.
    async fn save(&self, loan: &Loan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                member_id,
                book_id,
                title,
                author,
                issue_date,
                due_date,
                return_date,
                fine_paid
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (loan_id) DO NOTHING
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.member_id.value())
        .bind(loan.book_id.value())
        .bind(&loan.title)
        .bind(&loan.author)
        .bind(loan.issue_date)
        .bind(loan.due_date)
        .bind(loan.return_date)
        .bind(loan.fine_paid)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(&format!("{} WHERE loan_id = $1", SELECT_LOANS))
            .bind(loan_id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// Uses the member_id index
    async fn find_by_member_id(&self, member_id: MemberId) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!(
            "{} WHERE member_id = $1 ORDER BY issue_date DESC",
            SELECT_LOANS
        ))
        .bind(member_id.value())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn find_all(&self) -> Result<Vec<Loan>> {
        let rows = sqlx::query(&format!("{} ORDER BY issue_date DESC", SELECT_LOANS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    /// Mark fines paid atomically
    ///
    /// The conditional UPDATE only touches unpaid rows. If fewer rows change
    /// than were requested, another settlement got there first and the whole
    /// transaction is rolled back.
    async fn mark_fines_paid(&self, loan_ids: &[LoanId]) -> Result<bool> {
        if loan_ids.is_empty() {
            return Ok(true);
        }

        let ids: Vec<Uuid> = loan_ids.iter().map(LoanId::value).collect();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE loans
            SET fine_paid = TRUE, updated_at = NOW()
            WHERE loan_id = ANY($1) AND fine_paid = FALSE
            "#,
        )
        .bind(&ids)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != ids.len() as u64 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Record a return without touching fine_paid
    ///
    /// The `return_date IS NULL` guard makes a second return a no-op.
    async fn mark_returned(&self, loan_id: LoanId, returned_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET return_date = $2, updated_at = NOW()
            WHERE loan_id = $1 AND return_date IS NULL
            "#,
        )
        .bind(loan_id.value())
        .bind(returned_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
