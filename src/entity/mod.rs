//! SeaORM entity definitions.

pub mod company;
pub mod operator;
pub mod option_position;
pub mod position;
pub mod report;
pub mod security;
pub mod shareholder;
pub mod user;
