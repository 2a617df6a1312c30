//! 分页排版

pub mod composer;

pub use composer::{Page, PageComposer, PageLayout, Placement};
