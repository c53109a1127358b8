pub mod compare;
pub mod decision;
pub mod identify;
pub mod peaks;
