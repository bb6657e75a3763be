//! URL handling module for Comicer
//!
//! Link resolution for hrefs scraped off a source's pages, and the host key
//! all per-source state is namespaced by.

mod domain;
mod resolve;

pub use domain::host_key;
pub use resolve::{resolve, to_absolute};
