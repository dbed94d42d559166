pub mod chapter;
pub mod comparison;
pub mod records;

pub use chapter::{Chapter, ChapterHit};
pub use comparison::{BridgeMapping, ComparisonRow, Mrl, MISSING_MARKER};
pub use records::{ChineseRecord, EuSnapshot, EuropeanRecord};
