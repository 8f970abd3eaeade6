use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use fraud_cli::types::{LookupRow, RunResult};
use fraud_model::{Diagnostic, JoinReport, StageOutcome, StageStatus};
use fraud_transform::{OutlierScan, key_to_ip};

pub fn print_run_summary(result: &RunResult) {
    let report = &result.report;
    println!("Input: {} ({} rows)", report.input.display(), report.input_rows);
    match &report.output {
        Some(path) => println!(
            "Output: {} ({} rows, {} columns)",
            path.display(),
            report.output_rows,
            report.output_columns
        ),
        None if result.dry_run => println!(
            "Output: dry run, not written ({} rows, {} columns)",
            report.output_rows, report.output_columns
        ),
        None => {}
    }
    if let Some(path) = &result.report_path {
        println!("Run report: {}", path.display());
    }
    print_stage_table(&report.stages);
    if let Some(join) = &report.join {
        print_join_line(join);
    }
    print_diagnostic_table(&report.diagnostics);
    if report.has_skipped_stages() {
        eprintln!("Skipped stages:");
        for outcome in report.skipped_stages() {
            eprintln!(
                "- {}: {}",
                outcome.stage,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn print_stage_table(stages: &[StageOutcome]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Status"),
        header_cell("Rows in"),
        header_cell("Rows out"),
        header_cell("Columns"),
        header_cell("Time (ms)"),
    ]);
    apply_table_style(&mut table, 100);
    for index in 2..6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    for outcome in stages {
        table.add_row(vec![
            Cell::new(outcome.stage)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            status_cell(outcome.status),
            Cell::new(outcome.rows_in),
            rows_out_cell(outcome.rows_in, outcome.rows_out),
            Cell::new(outcome.columns_out),
            dim_cell(outcome.duration_ms),
        ]);
    }
    println!("{table}");
}

fn print_join_line(join: &JoinReport) {
    println!(
        "Geolocation: {} matched, {} unmatched, {} missing, {} malformed",
        join.matched, join.unmatched, join.absent_key, join.invalid_key
    );
}

fn print_diagnostic_table(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Stage"),
        header_cell("Kind"),
        header_cell("Column"),
        header_cell("Count"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table, 160);
    align_column(&mut table, 3, CellAlignment::Right);
    for diagnostic in diagnostics {
        let kind = if diagnostic.kind.is_warning() {
            Cell::new(diagnostic.kind).fg(Color::Yellow)
        } else {
            Cell::new(diagnostic.kind)
        };
        table.add_row(vec![
            Cell::new(diagnostic.stage),
            kind,
            diagnostic
                .column
                .as_deref()
                .map_or_else(|| dim_cell("-"), Cell::new),
            Cell::new(diagnostic.count),
            Cell::new(&diagnostic.message),
        ]);
    }
    println!();
    println!("Diagnostics:");
    println!("{table}");
}

pub fn print_lookup(rows: &[LookupRow]) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Address"),
        header_cell("Key"),
        header_cell("Canonical"),
        header_cell("Country"),
    ]);
    apply_table_style(&mut table, 120);
    align_column(&mut table, 1, CellAlignment::Right);
    for row in rows {
        let key = row.key.map_or_else(|| dim_cell("-"), Cell::new);
        let canonical = row
            .key
            .map_or_else(|| dim_cell("-"), |key| Cell::new(key_to_ip(key)));
        let country = match (&row.payload, &row.error) {
            (Some(payload), _) => Cell::new(payload).fg(Color::Green),
            (None, Some(error)) => Cell::new(error).fg(Color::Red),
            (None, None) => dim_cell("no match"),
        };
        table.add_row(vec![Cell::new(&row.address), key, canonical, country]);
    }
    println!("{table}");
}

pub fn print_outlier_scan(scan: &OutlierScan) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Column"),
        header_cell("Method"),
        header_cell("Lower"),
        header_cell("Upper"),
        header_cell("Non-null"),
        header_cell("Outliers"),
        header_cell("Share"),
    ]);
    apply_table_style(&mut table, 120);
    for index in 2..7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let bound = |value: Option<f64>| value.map_or_else(|| dim_cell("-"), |v| Cell::new(format!("{v:.4}")));
    let outliers = if scan.count() > 0 {
        Cell::new(scan.count())
            .fg(Color::Yellow)
            .add_attribute(Attribute::Bold)
    } else {
        dim_cell(0)
    };
    table.add_row(vec![
        Cell::new(&scan.column),
        Cell::new(scan.method.as_str()),
        bound(scan.lower),
        bound(scan.upper),
        Cell::new(scan.non_null),
        outliers,
        Cell::new(format!("{:.2}%", scan.fraction() * 100.0)),
    ]);
    println!("{table}");
    if let Some(reason) = &scan.degenerate {
        eprintln!("Statistics undefined: {reason}");
    }
}

fn status_cell(status: StageStatus) -> Cell {
    match status {
        StageStatus::Completed => Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        StageStatus::Skipped => Cell::new("skipped")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn rows_out_cell(rows_in: usize, rows_out: usize) -> Cell {
    if rows_out < rows_in {
        Cell::new(rows_out).fg(Color::Yellow)
    } else {
        Cell::new(rows_out)
    }
}

fn apply_table_style(table: &mut Table, width: u16) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(width);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
