// src/checks/mod.rs
pub mod numeric;
pub mod process;
pub mod sql;
pub mod url;

pub use numeric::Reading;
pub use process::{read_memory, MemoryKind, MemoryReadError};
pub use sql::SqlCheck;
pub use url::{default_url_check, UrlCheck, UrlResponse};
