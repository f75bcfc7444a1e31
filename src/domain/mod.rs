pub mod articles;
pub mod engagement;
pub mod error;
pub mod identity;
