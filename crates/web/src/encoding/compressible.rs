use regex::Regex;

use crate::FilterError;
use crate::config::CompressionConfig;

/// The set of content types that get gzipped.
///
/// Each pattern must match the whole mime type, parameters such as `; charset=UTF-8` excluded.
#[derive(Debug, Clone)]
pub struct CompressibleTypes {
    patterns: Vec<Regex>,
}

impl CompressibleTypes {
    pub fn new<I, S>(patterns: I) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref().trim();
                Regex::new(&format!("^(?:{pattern})$")).map_err(|e| FilterError::invalid_pattern(pattern, e))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// Parses a comma separated pattern list; blank entries are skipped.
    pub fn parse(list: &str) -> Result<Self, FilterError> {
        Self::new(list.split(',').filter(|pattern| !pattern.trim().is_empty()))
    }

    pub fn from_config(config: &CompressionConfig) -> Result<Self, FilterError> {
        Self::parse(&config.compressed_types)
    }

    pub fn is_compressible(&self, content_type: Option<&str>) -> bool {
        let Some(content_type) = content_type else {
            return false;
        };

        let mime = strip_params(content_type);
        self.patterns.iter().any(|pattern| pattern.is_match(mime))
    }
}

/// Cuts the type at the first `;`, leaving any whitespace in place.
fn strip_params(content_type: &str) -> &str {
    content_type.split_once(';').map_or(content_type, |(mime, _)| mime)
}
