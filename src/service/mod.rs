pub mod command;
pub mod earnings;
pub mod finance;
