//! Terminal tables

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, ContentArrangement, Table};
use pgdev_core::{ColumnInfo, ConnectionProfile, IndexInfo, QueryResult};
use pgdev_index::SearchRecord;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header.iter().map(|h| Cell::new(*h)));
    table
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "" }
}

pub fn profiles_table<'a>(
    profiles: impl IntoIterator<Item = &'a ConnectionProfile>,
    active: Option<&str>,
) -> Table {
    let mut out = table(&["", "Name", "Host", "Port", "Database", "User", "SSL"]);
    for profile in profiles {
        let marker = if active == Some(profile.name()) { "*" } else { "" };
        out.add_row(vec![
            marker.to_string(),
            profile.name().to_string(),
            profile.host().to_string(),
            profile.port().to_string(),
            profile.database().to_string(),
            profile.username().to_string(),
            yes_no(profile.use_ssl()).to_string(),
        ]);
    }
    out
}

pub fn search_table(records: &[SearchRecord]) -> Table {
    let mut out = table(&["Name", "Type", "Schema"]);
    for record in records {
        out.add_row(vec![
            record.name.clone(),
            record.kind.to_string(),
            record.schema.clone(),
        ]);
    }
    out
}

pub fn schemas_table(rows: &[(String, usize, usize, usize)]) -> Table {
    let mut out = table(&["Schema", "Tables", "Functions", "Procedures"]);
    for (schema, tables, functions, procedures) in rows {
        out.add_row(vec![
            schema.clone(),
            tables.to_string(),
            functions.to_string(),
            procedures.to_string(),
        ]);
    }
    out
}

pub fn columns_table(columns: &[ColumnInfo]) -> Table {
    let mut out = table(&["#", "Column", "Type", "Nullable", "Default"]);
    for column in columns {
        out.add_row(vec![
            column.ordinal.to_string(),
            column.name.clone(),
            column.data_type.clone(),
            yes_no(column.nullable).to_string(),
            column.default_value.clone().unwrap_or_default(),
        ]);
    }
    out
}

pub fn indexes_table(indexes: &[IndexInfo]) -> Table {
    let mut out = table(&["Index", "Columns", "Unique", "Primary"]);
    for index in indexes {
        out.add_row(vec![
            index.name.clone(),
            index.columns.join(", "),
            yes_no(index.is_unique).to_string(),
            yes_no(index.is_primary).to_string(),
        ]);
    }
    out
}

pub fn query_result_table(columns: &[String], rows: &[pgdev_core::Row]) -> Table {
    let mut out = table(&columns.iter().map(String::as_str).collect::<Vec<_>>());
    for row in rows {
        out.add_row(row.values.iter().map(|v| v.to_string()).collect::<Vec<_>>());
    }
    out
}

pub fn print_query_result(result: &QueryResult) {
    match result {
        QueryResult::Rows {
            columns,
            rows,
            message,
        } => {
            println!("{}", query_result_table(columns, rows));
            println!("{message} ({} rows)", rows.len());
        }
        QueryResult::Update { message, .. } => println!("{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgdev_core::{Row, Value};
    use pgdev_index::ObjectKind;

    #[test]
    fn profiles_table_marks_active() {
        let dev = ConnectionProfile::new("dev", "localhost", 5432, "app", "postgres");
        let prod = ConnectionProfile::new("prod", "db.internal", 6432, "app", "reader").with_ssl(true);
        let rendered = profiles_table([&dev, &prod], Some("prod")).to_string();

        let prod_line = rendered
            .lines()
            .find(|line| line.contains("db.internal"))
            .expect("prod row");
        assert!(prod_line.contains('*'));
        assert!(prod_line.contains("yes"));
        let dev_line = rendered
            .lines()
            .find(|line| line.contains("localhost"))
            .expect("dev row");
        assert!(!dev_line.contains('*'));
    }

    #[test]
    fn search_table_shows_kind_tags() {
        let rendered = search_table(&[SearchRecord::new("orders", ObjectKind::Table, "public")])
            .to_string();
        assert!(rendered.contains("orders"));
        assert!(rendered.contains("TABLE"));
    }

    #[test]
    fn query_rows_render_values() {
        let rendered = query_result_table(
            &["id".to_string(), "name".to_string()],
            &[Row::new(vec![Value::Int64(7), Value::Null])],
        )
        .to_string();
        assert!(rendered.contains("id"));
        assert!(rendered.contains('7'));
    }
}
