pub mod in_memory_file_system;
pub mod in_memory_vector_index;
pub mod local_file_system;
pub mod ollama_repository;
pub mod qdrant_vector_index;
pub mod source_file_http_repository;
