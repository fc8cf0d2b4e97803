pub mod collection_path;
pub mod generated_code;
