pub mod api;
pub mod money;
