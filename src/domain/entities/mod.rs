pub mod cache_record;
pub mod source;
pub mod vector_point;
