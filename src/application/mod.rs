pub mod articles;
pub mod engagement;
pub mod error;
pub mod reading_time;
pub mod recommend;
pub mod repos;
pub mod sync;
