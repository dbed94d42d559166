pub mod comparison_flow;
pub mod document_flow;
pub mod eu_update_flow;

pub use comparison_flow::ComparisonFlow;
pub use document_flow::{DocumentFlow, DocumentUpload};
pub use eu_update_flow::EuUpdateFlow;
