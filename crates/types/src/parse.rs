//! Text parsing helpers shared by the value types

use std::fmt;
use std::str::FromStr;

/// Error returned when text cannot be parsed into a value type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    kind: &'static str,
    input: String,
}

impl ParseError {
    /// Create an error for the named value type
    pub fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }

    /// Name of the type that failed to parse
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: {:?}", self.kind, self.input)
    }
}

impl std::error::Error for ParseError {}

/// Parse exactly `N` comma separated components
pub(crate) fn parse_components<T, const N: usize>(
    text: &str,
    kind: &'static str,
) -> Result<[T; N], ParseError>
where
    T: FromStr + Copy + Default,
{
    let mut out = [T::default(); N];
    let mut count = 0;

    for part in text.split(',') {
        if count == N {
            return Err(ParseError::new(kind, text));
        }
        out[count] = part
            .trim()
            .parse()
            .map_err(|_| ParseError::new(kind, text))?;
        count += 1;
    }

    if count != N {
        return Err(ParseError::new(kind, text));
    }
    Ok(out)
}

/// Write components separated by `", "`
pub(crate) fn write_components<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    values: &[T],
) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_components() {
        let parsed: [f32; 3] = parse_components("1, 2.5,-3", "Vector3").unwrap();
        assert_eq!(parsed, [1.0, 2.5, -3.0]);
    }

    #[test]
    fn test_parse_components_wrong_count() {
        assert!(parse_components::<f32, 3>("1, 2", "Vector3").is_err());
        assert!(parse_components::<f32, 2>("1, 2, 3", "Vector2").is_err());
        assert!(parse_components::<u8, 1>("300", "Color").is_err());
    }
}
