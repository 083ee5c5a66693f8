//! Run-report rendering.

use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use ech_model::{BatchStatus, IssueSeverity, RunReport};

pub fn print_report(report: &RunReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Family"),
        header_cell("Status"),
        header_cell("Rows read"),
        header_cell("Records"),
        header_cell("Nulls"),
        header_cell("Facts"),
        header_cell("Skipped"),
        header_cell("Error"),
    ]);
    apply_table_style(&mut table);
    for index in 2..=6 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let mut total_facts = 0u64;
    let mut total_skipped = 0u64;
    for family in &report.families {
        total_facts += family.facts;
        total_skipped += family.skipped_total();
        table.add_row(vec![
            Cell::new(family.family.as_str())
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
            status_cell(family.status),
            Cell::new(family.rows_read),
            Cell::new(family.records),
            Cell::new(family.missing),
            Cell::new(family.facts),
            count_cell(family.skipped_total(), Color::Yellow),
            match &family.error {
                Some(error) => Cell::new(error).fg(Color::Red),
                None => dim_cell("-"),
            },
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        dim_cell("-"),
        Cell::new(total_facts).add_attribute(Attribute::Bold),
        count_cell(total_skipped, Color::Yellow).add_attribute(Attribute::Bold),
        dim_cell("-"),
    ]);
    println!("{table}");

    print_skip_reasons(report);
    print_issues(report);
}

fn print_skip_reasons(report: &RunReport) {
    let mut rows = Vec::new();
    for family in &report.families {
        for (reason, count, samples) in family.skipped.reasons() {
            rows.push((
                family.family.as_str(),
                reason.to_string(),
                count,
                samples.join(", "),
            ));
        }
    }
    if rows.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Family"),
        header_cell("Skip reason"),
        header_cell("Count"),
        header_cell("Examples"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 2, CellAlignment::Right);
    for (family, reason, count, examples) in rows {
        table.add_row(vec![
            Cell::new(family),
            Cell::new(reason),
            Cell::new(count),
            if examples.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(examples)
            },
        ]);
    }
    println!();
    println!("Skipped rows:");
    println!("{table}");
}

fn print_issues(report: &RunReport) {
    if report.issues.is_empty() {
        return;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Check"),
        header_cell("Severity"),
        header_cell("Count"),
        header_cell("Message"),
        header_cell("Examples"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Right);
    for issue in &report.issues {
        table.add_row(vec![
            Cell::new(&issue.check),
            severity_cell(issue.severity),
            match issue.count {
                Some(count) => Cell::new(count),
                None => dim_cell("-"),
            },
            Cell::new(&issue.message),
            if issue.sample.is_empty() {
                dim_cell("-")
            } else {
                Cell::new(issue.sample.join(", "))
            },
        ]);
    }
    println!();
    println!("Integrity findings:");
    println!("{table}");
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(140);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn status_cell(status: BatchStatus) -> Cell {
    match status {
        BatchStatus::Loaded => Cell::new("loaded")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
        BatchStatus::Aborted => Cell::new("ABORTED")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        BatchStatus::Skipped => Cell::new("skipped").fg(Color::DarkGrey),
    }
}

fn severity_cell(severity: IssueSeverity) -> Cell {
    match severity {
        IssueSeverity::Error => Cell::new("ERROR").fg(Color::Red),
        IssueSeverity::Warning => Cell::new("WARN").fg(Color::Yellow),
    }
}

fn count_cell(count: u64, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
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
