pub use crate::error::Error;

pub use anstream::println;
pub use color_eyre::eyre::{eyre, Context, Result};
pub use std::format as f;

pub fn new_table() -> prettytable::Table {
    let mut table = prettytable::Table::new();

    let format = prettytable::format::FormatBuilder::new()
        .padding(1, 1)
        .build();

    table.set_format(format);

    table
}

/// Pretty-printed JSON with four-space indentation. Non-ASCII text is
/// written as is.
pub fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8(buf)?)
}

/// The file name of `path` without its extension.
pub fn file_stem(path: &std::path::Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidFileName(path.display().to_string()).into())
}

/// Read and parse a stored annotation file.
pub fn read_elements(path: &std::path::Path) -> Result<pagelabel_core::PageElements> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| f!("Failed to read {}", path.display()))?;
    pagelabel_core::PageElements::from_json_str(&text)
        .map_err(|e| eyre!(e))
        .wrap_err_with(|| f!("Invalid annotation file {}", path.display()))
}
