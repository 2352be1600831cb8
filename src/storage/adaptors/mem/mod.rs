mod mem_document_store;

pub use mem_document_store::*;
