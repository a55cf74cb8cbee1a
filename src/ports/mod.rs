pub mod file_system;
pub mod language_model;
pub mod pdf_extractor;
pub mod source_file_repository;
pub mod vector_index;
