pub mod loan_repository;
pub mod member_service;

pub use loan_repository::LoanRepository;
pub use member_service::MemberService;
