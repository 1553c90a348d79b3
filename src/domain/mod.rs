pub mod countdown;
pub mod models;
