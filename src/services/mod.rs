pub mod eu_feed;
pub mod lenient_parser;
pub mod mrl_reconciler;
pub mod name_normalizer;
pub mod pesticide_bridge;
pub mod report_writer;
pub mod section_chunker;
pub mod value_extraction;

pub use report_writer::ReportWriter;
