pub mod context;
pub mod defs;
