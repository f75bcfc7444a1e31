pub mod cms;
pub mod db;
pub mod error;
pub mod fallback;
pub mod http;
pub mod telemetry;
