pub mod course;
pub mod place;
pub mod preference;
