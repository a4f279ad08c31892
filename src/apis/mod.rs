pub mod base;
pub mod factory;
pub mod parsers;
