//! Text matching: tokenization, pattern translation, term matching and
//! the proximity scanner used to verify phrase/near queries.

mod scan;
mod terms;
mod tokenizer;
mod translate;

pub use scan::{DistanceWindow, ScanContext, TextScanner};
pub use terms::SearchTerm;
pub use tokenizer::{Token, Tokenizer, WordTokenizer};
pub use translate::{glob_to_regex, translate};
