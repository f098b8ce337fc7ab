//! Output formatting for the pghitl CLI.
//!
//! This module provides output writers for formatting command results in
//! different formats.
//!
//! ## What
//!
//! - [`OutputWriter`] enum handles different output formats (JSON, Table)
//! - [`JsonOutputWriter`] serializes results to JSON
//! - [`TableOutputWriter`] displays results in human-readable tables
//!
//! ## How
//!
//! Use the appropriate writer based on user preference for displaying CLI
//! command results.

use serde::Serialize;
use tabled::{Table, Tabled};

pub enum OutputWriter {
    /// Display results in a human-readable table
    Table(TableOutputWriter),
    /// Display results as JSON
    Json(JsonOutputWriter),
}

impl OutputWriter {
    /// Write a list of items using the configured output format.
    pub fn write_list<T: Serialize + Tabled>(
        &self,
        items: &[T],
        out: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        match self {
            OutputWriter::Table(writer) => writer.write_list(items, out),
            OutputWriter::Json(writer) => writer.write_list(items, out),
        }
    }

    /// Write a single item using the configured output format.
    pub fn write_item<T: Serialize + Tabled>(
        &self,
        item: &T,
        out: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        match self {
            OutputWriter::Table(writer) => writer.write_item(item, out),
            OutputWriter::Json(writer) => writer.write_item(item, out),
        }
    }
}

/// Writer for formatting output as human-readable tables
pub struct TableOutputWriter;
impl TableOutputWriter {
    /// Write items as a formatted table.
    pub fn write_list<T: Serialize + Tabled>(
        &self,
        items: &[T],
        out: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        let table = Table::new(items);
        writeln!(out, "{}", table)?;
        Ok(())
    }

    /// Write a single item as a formatted table.
    pub fn write_item<T: Serialize + Tabled>(
        &self,
        item: &T,
        out: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        self.write_list(std::slice::from_ref(item), out)
    }
}

/// Writer for formatting output as JSON
pub struct JsonOutputWriter;
impl JsonOutputWriter {
    /// Write items as pretty-printed JSON.
    pub fn write_list<T: Serialize>(
        &self,
        items: &[T],
        out: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(items)?;
        writeln!(out, "{}", json)?;
        Ok(())
    }

    /// Write a single item as pretty-printed JSON.
    pub fn write_item<T: Serialize>(
        &self,
        item: &T,
        out: &mut dyn std::io::Write,
    ) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(item)?;
        writeln!(out, "{}", json)?;
        Ok(())
    }
}
