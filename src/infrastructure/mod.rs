pub mod pdf_loader;
pub mod store;

pub use pdf_loader::PdfLoader;
pub use store::MrlStore;
