//! fintrack-domain
//!
//! Pure domain models (Expense, Income, Budget, Goal and their closed enums).
//! No I/O, no storage. Only data types, month arithmetic and derived-state rules.

pub mod budget;
pub mod category;
pub mod common;
pub mod expense;
pub mod goal;
pub mod income;

pub use budget::*;
pub use category::*;
pub use common::*;
pub use expense::*;
pub use goal::*;
pub use income::*;
