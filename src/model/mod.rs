// src/model/mod.rs
//! Domain model: notes going in, Notion block trees coming out.

pub mod block;
pub mod document;
pub mod rich_text;

pub use block::BlockNode;
pub use document::{FormattedDocument, Note};
pub use rich_text::{plain_text, Annotations, TextRun};
