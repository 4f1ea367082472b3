pub mod curve;
pub mod history;
pub mod tools;
