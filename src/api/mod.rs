pub mod reimbursement;
pub mod user;
