//! Input/output: export parsing, reader templates, storage seams, JSON export.

pub mod export;
pub mod source;
pub mod store;
pub mod table;
pub mod templates;
