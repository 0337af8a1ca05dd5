pub mod report;
pub mod sessions;
pub mod simulate;
pub mod validate;
