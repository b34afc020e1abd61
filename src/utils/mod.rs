pub mod command;
pub mod depth;
pub mod file;
pub mod plotting;
pub mod system;
