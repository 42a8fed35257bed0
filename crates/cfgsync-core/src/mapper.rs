//! Repository path mapping
//!
//! Maps an object's portable key to its file path relative to the
//! repository root, and back:
//!
//! ```text
//! <type>/<identifier>.toml
//! <type>/@<scope>/<identifier>.toml
//! ```
//!
//! Every segment is escaped: bytes outside `[A-Za-z0-9._-]` become `%XX`
//! (uppercase hex). A leading or trailing `.` and Windows device names
//! (`CON`, `NUL`, `COM1`, ...) are escaped as well so every path is valid
//! on every platform. Because `@` is always escaped inside segments, a
//! directory starting with `@` is unambiguously a scope.
//!
//! Only canonical paths are accepted by [`from_path`], which makes the two
//! functions exact inverses.

use cfgsync_content::DOCUMENT_EXTENSION;
use cfgsync_meta::ObjectKey;

use crate::error::{Error, Result};

/// Longest file name accepted by common filesystems, in bytes
const MAX_FILE_NAME_BYTES: usize = 255;

const SCOPE_PREFIX: char = '@';

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Relative file path of an object.
///
/// # Errors
///
/// Returns `Error::InvalidPath` for an empty type, scope or identifier, or
/// when the escaped file name is too long.
pub fn to_path(key: &ObjectKey) -> Result<String> {
    let display = key.to_string();
    let type_dir = escape_required(&key.type_name, &display, "type name")?;
    let file = format!(
        "{}.{}",
        escape_required(&key.identifier, &display, "identifier")?,
        DOCUMENT_EXTENSION
    );
    if file.len() > MAX_FILE_NAME_BYTES {
        return Err(Error::invalid_path(
            display,
            format!(
                "escaped file name is {} bytes, the limit is {MAX_FILE_NAME_BYTES}",
                file.len()
            ),
        ));
    }

    Ok(match &key.scope {
        Some(scope) => format!(
            "{type_dir}/{SCOPE_PREFIX}{}/{file}",
            escape_required(scope, &display, "scope")?
        ),
        None => format!("{type_dir}/{file}"),
    })
}

/// Directory holding all objects of a type.
pub fn type_dir(type_name: &str) -> Result<String> {
    escape_required(type_name, type_name, "type name")
}

/// Portable key of the object stored at a relative path.
///
/// # Errors
///
/// Returns `Error::InvalidPath` when the path does not have the repository
/// layout or is not in canonical form.
pub fn from_path(path: &str) -> Result<ObjectKey> {
    let segments: Vec<&str> = path.split('/').collect();
    let (type_segment, scope_segment, file) = match segments.as_slice() {
        [type_segment, file] => (*type_segment, None, *file),
        [type_segment, scope, file] => {
            let scope = scope
                .strip_prefix(SCOPE_PREFIX)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| Error::invalid_path(path, "scope directory must start with '@'"))?;
            (*type_segment, Some(scope), *file)
        }
        _ => {
            return Err(Error::invalid_path(
                path,
                "expected <type>/<identifier> or <type>/@<scope>/<identifier>",
            ));
        }
    };

    let stem = file
        .strip_suffix(DOCUMENT_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::invalid_path(path, "not an object document"))?;

    let key = ObjectKey::new(
        unescape(type_segment, path)?,
        scope_segment.map(|s| unescape(s, path)).transpose()?,
        unescape(stem, path)?,
    );

    if to_path(&key)? != path {
        return Err(Error::invalid_path(path, "path is not in canonical form"));
    }
    Ok(key)
}

fn escape_required(value: &str, context: &str, what: &str) -> Result<String> {
    if value.is_empty() {
        return Err(Error::invalid_path(context, format!("{what} is empty")));
    }
    Ok(escape(value))
}

/// Escape one path segment.
pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'_' | b'-') {
            out.push(byte as char);
        } else {
            push_escaped(&mut out, byte);
        }
    }

    if out.starts_with('.') {
        out.replace_range(..1, "%2E");
    }
    if out.ends_with('.') {
        out.truncate(out.len() - 1);
        out.push_str("%2E");
    }

    let base = out.split('.').next().unwrap_or_default();
    if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(base)) {
        let first = out.as_bytes()[0];
        let mut escaped = String::with_capacity(out.len() + 2);
        push_escaped(&mut escaped, first);
        escaped.push_str(&out[1..]);
        out = escaped;
    }
    out
}

fn push_escaped(out: &mut String, byte: u8) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    out.push('%');
    out.push(HEX[usize::from(byte >> 4)] as char);
    out.push(HEX[usize::from(byte & 0x0f)] as char);
}

fn unescape(segment: &str, path: &str) -> Result<String> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = segment
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| Error::invalid_path(path, "malformed escape sequence"))?;
            out.push(hex);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).map_err(|_| Error::invalid_path(path, "escaped bytes are not UTF-8"))
}
