pub mod cache;
pub mod mongo;
pub mod place_cache;
