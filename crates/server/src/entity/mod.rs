pub mod marked;
pub mod problem;
pub mod user;
