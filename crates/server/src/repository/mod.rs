mod problem_repository;
mod transaction;
mod user_repository;

pub use problem_repository::{
    NewProblem, PROBLEM_NAMESPACE, ProblemRecord, ProblemRepository, SeaOrmProblemRepository,
    UpdateProblem,
};
pub use transaction::WriteTransaction;
pub use user_repository::{NewUser, SeaOrmUserRepository, UserRecord, UserRepository};

use sea_orm::{DbErr, SqlErr};

/// The driver message of the unique-constraint violation behind `err`, if
/// that is what failed.
pub fn unique_violation(err: &anyhow::Error) -> Option<String> {
    match err.downcast_ref::<DbErr>()?.sql_err()? {
        SqlErr::UniqueConstraintViolation(message) => Some(message),
        _ => None,
    }
}
