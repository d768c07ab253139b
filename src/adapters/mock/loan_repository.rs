use crate::domain::{
    loan::Loan,
    value_objects::{LoanId, MemberId},
};
use crate::ports::loan_repository::{LoanRepository as LoanRepositoryTrait, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// In-memory implementation of LoanRepository
///
/// Used by the integration tests and for running the service without a
/// database. `mark_fines_paid` holds the lock for the whole check-and-set,
/// so it gives the same all-or-nothing guarantee as the PostgreSQL adapter.
pub struct LoanRepository {
    loans: Mutex<HashMap<LoanId, Loan>>,
}

impl LoanRepository {
    pub fn new() -> Self {
        Self {
            loans: Mutex::new(HashMap::new()),
        }
    }

    /// Create a repository pre-populated with loans
    pub fn with_loans(loans: impl IntoIterator<Item = Loan>) -> Self {
        let repository = Self::new();
        if let Ok(mut store) = repository.loans.lock() {
            store.extend(loans.into_iter().map(|loan| (loan.loan_id, loan)));
        }
        repository
    }

    fn store(&self) -> Result<MutexGuard<'_, HashMap<LoanId, Loan>>> {
        self.loans
            .lock()
            .map_err(|e| format!("loan store lock poisoned: {}", e).into())
    }

    /// Loans sorted newest issue first, matching the PostgreSQL adapter
    fn sorted(mut loans: Vec<Loan>) -> Vec<Loan> {
        loans.sort_by(|a, b| b.issue_date.cmp(&a.issue_date));
        loans
    }
}

impl Default for LoanRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanRepositoryTrait for LoanRepository {
    async fn save(&self, loan: &Loan) -> Result<()> {
        self.store()?
            .entry(loan.loan_id)
            .or_insert_with(|| loan.clone());
        Ok(())
    }

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.store()?.get(&loan_id).cloned())
    }

    async fn find_by_member_id(&self, member_id: MemberId) -> Result<Vec<Loan>> {
        let loans = self
            .store()?
            .values()
            .filter(|loan| loan.member_id == member_id)
            .cloned()
            .collect();
        Ok(Self::sorted(loans))
    }

    async fn find_all(&self) -> Result<Vec<Loan>> {
        let loans = self.store()?.values().cloned().collect();
        Ok(Self::sorted(loans))
    }

    async fn mark_fines_paid(&self, loan_ids: &[LoanId]) -> Result<bool> {
        let mut store = self.store()?;

        let all_unpaid = loan_ids
            .iter()
            .all(|id| store.get(id).is_some_and(|loan| !loan.fine_paid));
        if !all_unpaid {
            return Ok(false);
        }

        for id in loan_ids {
            if let Some(loan) = store.remove(id) {
                store.insert(*id, loan.with_fine_paid());
            }
        }
        Ok(true)
    }

    async fn mark_returned(&self, loan_id: LoanId, returned_at: DateTime<Utc>) -> Result<bool> {
        let mut store = self.store()?;

        match store.remove(&loan_id) {
            Some(loan) if !loan.is_returned() => {
                store.insert(loan_id, loan.with_return_date(returned_at));
                Ok(true)
            }
            Some(loan) => {
                store.insert(loan_id, loan);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}
