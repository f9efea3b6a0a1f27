use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A printable result row.
pub trait Record: Serialize {
    /// Column headers, in cell order.
    fn columns() -> &'static [&'static str];
    /// Display cells for table and pretty output.
    fn cells(&self) -> Vec<String>;
}

/// Print a single record.
pub fn print_one<R: Record>(record: &R, format: OutputFormat) {
    println!("{}", render_one(record, format));
}

/// Print a list of records.
pub fn print_all<R: Record>(records: &[R], format: OutputFormat) {
    println!("{}", render_all(records, format));
}

pub fn render_one<R: Record>(record: &R, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(record),
        _ => render_all(std::slice::from_ref(record), format),
    }
}

pub fn render_all<R: Record>(records: &[R], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => to_json(&records),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(R::columns().to_vec());
            for record in records {
                table.add_row(record.cells());
            }
            table.to_string()
        }
        OutputFormat::Pretty => records
            .iter()
            .map(|record| {
                R::columns()
                    .iter()
                    .zip(record.cells())
                    .map(|(column, cell)| format!("{}={cell}", column.to_lowercase()))
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}
