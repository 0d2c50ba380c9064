//! CSV export of rows and table views.

use bizdesk_lib::model::Row;
use bizdesk_lib::model::Value;
use bizdesk_lib::table::ExportColumn;
use bizdesk_lib::table::TableConfig;
use bizdesk_lib::table::TableState;
use bizdesk_lib::table::default_export_filename;
use bizdesk_lib::table::export_csv;
use bizdesk_lib::table::export_table;
use bizdesk_lib::table::write_export;
use chrono::TimeZone;
use chrono::Utc;

#[test]
fn test_comma_in_cell_is_quoted() {
    let rows = vec![Row::new().set("a", "x,y").set("b", "z")];
    let columns = [ExportColumn::new("a", "A"), ExportColumn::new("b", "B")];

    assert_eq!(export_csv(&rows, &columns).unwrap(), "A,B\n\"x,y\",z");
}

#[test]
fn test_transform_runs_before_stringifying() {
    let rows = vec![
        Row::new().set("name", "Lamp").set("price", 1999i64),
        Row::new().set("name", "Desk"),
    ];
    let cents = |v: &Value| match v.as_f64() {
        Some(c) => Value::String(format!("${:.2}", c / 100.0)),
        None => Value::String("n/a".into()),
    };
    let columns = [
        ExportColumn::new("name", "Name"),
        ExportColumn::new("price", "Price").with_transform(cents),
    ];

    assert_eq!(export_csv(&rows, &columns).unwrap(), "Name,Price\nLamp,$19.99\nDesk,n/a");
}

#[test]
fn test_single_column_null_cell_is_empty_line() {
    let rows = vec![Row::new().set("a", Value::Null)];
    let columns = [ExportColumn::new("a", "A")];

    assert_eq!(export_csv(&rows, &columns).unwrap(), "A\n");
}

#[test]
fn test_export_follows_table_view() {
    let rows = (1..=25i64).map(|i| Row::new().set("n", i)).collect::<Vec<_>>();
    let mut table = TableState::new(rows, TableConfig::new());
    table.handle_sort("n");
    table.handle_sort("n");

    let csv = export_table(&table, &[ExportColumn::new("n", "N")]).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 26);
    assert_eq!(lines[1], "25");
    assert_eq!(lines[25], "1");
}

#[test]
fn test_default_filename() {
    let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 30).unwrap();
    assert_eq!(default_export_filename(&at), "export_2024-03-07_09-05-30.csv");
}

#[test]
fn test_write_export_uses_given_name() {
    let dir = std::env::temp_dir();
    let name = format!("bizdesk-export-{}.csv", uuid::Uuid::new_v4());

    let path = write_export(&dir, Some(&name), "A,B\n1,2").unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "A,B\n1,2");

    std::fs::remove_file(path).unwrap();
}
