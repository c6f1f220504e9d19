pub mod handlers;
pub mod seed;
