//! HTML rendering.
//!
//! Plain `format!`-built markup, enhanced with htmx attributes.
//!
//! # Structure
//!
//! - [`page`]: page shell, chat panel and composer
//! - [`markdown`]: markdown and text escaping for transcript rows

pub mod markdown;
pub mod page;
