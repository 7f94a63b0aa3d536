pub mod cv;
pub mod profile;
pub mod selection;
