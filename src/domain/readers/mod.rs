pub mod pdf_reader;
