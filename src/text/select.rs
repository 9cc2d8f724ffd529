//! Column projection for delimited files

use crate::error::{IoResultExt, Result};
use crate::text::open_output;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

/// Project named columns out of a delimited file. The header row names the
/// columns; output column order follows the header, not the request. Rows
/// shorter than the header yield empty cells. The file need not be well
/// structured beyond its delimiter.
pub fn select(file: &Path, columns: &[String], delimiter: &str, output: Option<&Path>) -> Result<()> {
    let mut reader = BufReader::new(File::open(file).with_path(file)?);
    let mut header = String::new();
    reader.read_line(&mut header).with_path(file)?;
    let mut index = Vec::new();
    let mut selected = Vec::new();
    for (idx, field) in header.trim_end_matches('\n').split(delimiter).enumerate() {
        if columns.iter().any(|c| c == field) {
            index.push(idx);
            selected.push(field.to_string());
        }
    }
    let mut writer = open_output(output)?;
    writeln!(writer, "{}", selected.join(delimiter)).with_path(file)?;
    for line in reader.lines() {
        let line = line.with_path(file)?;
        let fields: Vec<&str> = line.split(delimiter).collect();
        let row: Vec<&str> = index
            .iter()
            .map(|&i| fields.get(i).copied().unwrap_or(""))
            .collect();
        writeln!(writer, "{}", row.join(delimiter)).with_path(file)?;
    }
    writer.flush().with_path(file)?;
    Ok(())
}
