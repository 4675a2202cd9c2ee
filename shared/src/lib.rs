pub mod engine;
pub mod errors;
pub mod log;
pub mod nonce;
pub mod problem;
pub mod store;

pub fn timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
