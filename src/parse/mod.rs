mod error;
mod grammar;

pub use error::ParseError;

use crate::expand::Entry;

/// Parse rule DSL text into a declaration stream.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid DSL syntax.
pub fn parse(input: &str) -> Result<Vec<Entry>, ParseError> {
    use winnow::Parser;
    grammar::parse_entries
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
