use crate::config::types::ConfigError;
use std::path::Path;

/// Loads a `key=value` properties file as layer entries, in file order.
///
/// A missing file is not an error and contributes no entries. A file that is
/// present but unreadable, not UTF-8, or syntactically malformed is fatal.
pub fn load(path: &Path) -> Result<Option<Vec<(String, String)>>, ConfigError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(error) => {
            return Err(ConfigError::Unreadable {
                path: path.to_path_buf(),
                source: error,
            });
        }
    };

    let text = String::from_utf8(bytes).map_err(|_| ConfigError::InvalidEncoding {
        path: path.to_path_buf(),
    })?;

    Ok(Some(parse(&text, path)?))
}

/// Parses properties text: one `key=value` per line, `#` or `!` comments,
/// blank lines ignored, whitespace around keys and values trimmed.
pub fn parse(text: &str, path: &Path) -> Result<Vec<(String, String)>, ConfigError> {
    let mut entries = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::MalformedLine {
                path: path.to_path_buf(),
                line: index + 1,
            });
        };
        entries.push((key.trim().to_string(), value.trim().to_string()));
    }
    Ok(entries)
}
