mod booking_repository;
mod instructor_repository;
mod user_repository;

pub use booking_repository::*;
pub use instructor_repository::*;
pub use user_repository::*;
