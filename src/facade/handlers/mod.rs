pub mod health;
pub mod orders;
pub mod queries;
pub mod symbols;
