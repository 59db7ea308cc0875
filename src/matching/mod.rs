//! Record matching against receivables and statement lines

pub mod statement;
pub mod title;

pub use statement::StatementMatcher;
pub use title::TitleMatcher;
