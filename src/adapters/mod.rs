pub mod columnar;
pub mod export;
pub mod seed;
pub mod source_db;
