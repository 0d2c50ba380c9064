//! Property tests for the table state engine.

use bizdesk_lib::model::Row;
use bizdesk_lib::table::FilterSpec;
use bizdesk_lib::table::TableConfig;
use bizdesk_lib::table::TableState;
use proptest::prelude::*;

const STATUSES: [&str; 3] = ["active", "inactive", "pending"];

fn row_strategy() -> impl Strategy<Value = Row> {
    ("[a-zA-Z ]{0,8}", 0..STATUSES.len(), -50i64..50).prop_map(|(name, status, amount)| {
        Row::new()
            .set("name", name)
            .set("status", STATUSES[status])
            .set("amount", amount)
    })
}

fn rows_strategy() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(row_strategy(), 0..60)
}

fn config(items_per_page: usize) -> TableConfig {
    TableConfig::new()
        .search_fields(["name"])
        .filter("status", FilterSpec::field("status"))
        .items_per_page(items_per_page)
}

fn text(row: &Row, field: &str) -> String {
    row.get_string(field).unwrap().unwrap_or_default().to_string()
}

proptest! {
    #[test]
    fn prop_default_state_shows_first_page(rows in rows_strategy(), per_page in 1usize..15) {
        let table = TableState::new(rows.clone(), config(per_page));

        let filtered: Vec<Row> = table.filtered_data().into_iter().cloned().collect();
        prop_assert_eq!(&filtered, &rows);

        let page: Vec<Row> = table.paginated_data().into_iter().cloned().collect();
        let expected: Vec<Row> = rows.iter().take(per_page).cloned().collect();
        prop_assert_eq!(page, expected);
    }

    #[test]
    fn prop_search_keeps_exactly_matching_rows(rows in rows_strategy(), term in "[a-zA-Z]{1,2}") {
        let mut table = TableState::new(rows.clone(), config(10));
        table.set_search_term(term.clone());

        let needle = term.to_lowercase();
        for row in table.filtered_data() {
            prop_assert!(text(row, "name").to_lowercase().contains(&needle));
        }
        let expected = rows.iter().filter(|r| text(r, "name").to_lowercase().contains(&needle)).count();
        prop_assert_eq!(table.filtered_len(), expected);
    }

    #[test]
    fn prop_filter_keeps_exactly_equal_rows(rows in rows_strategy(), status in 0..STATUSES.len()) {
        let mut table = TableState::new(rows.clone(), config(10));
        table.set_filter("status", STATUSES[status]);

        for row in table.filtered_data() {
            prop_assert_eq!(text(row, "status"), STATUSES[status]);
        }
        let expected = rows.iter().filter(|r| text(r, "status") == STATUSES[status]).count();
        prop_assert_eq!(table.filtered_len(), expected);
    }

    #[test]
    fn prop_page_lengths(rows in rows_strategy(), per_page in 1usize..15) {
        let mut table = TableState::new(rows, config(per_page));
        let total = table.filtered_len();

        if total == 0 {
            prop_assert!(table.paginated_data().is_empty());
        }
        for page in 1..=table.total_pages() {
            table.set_current_page(page);
            let expected = per_page.min(total - (page - 1) * per_page);
            prop_assert_eq!(table.paginated_data().len(), expected);
        }
    }

    #[test]
    fn prop_second_sort_is_descending(rows in rows_strategy()) {
        let mut table = TableState::new(rows, config(10));
        table.handle_sort("amount");
        table.handle_sort("amount");

        let amounts: Vec<i64> = table
            .filtered_data()
            .iter()
            .map(|r| r.get_int("amount").unwrap().unwrap())
            .collect();
        prop_assert!(amounts.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn prop_clear_filters_twice_equals_once(rows in rows_strategy(), term in "[a-z]{0,3}") {
        let mut table = TableState::new(rows, config(10));
        table.set_search_term(term);
        table.set_filter("status", "active");

        table.clear_filters();
        let once: Vec<Row> = table.filtered_data().into_iter().cloned().collect();
        table.clear_filters();
        let twice: Vec<Row> = table.filtered_data().into_iter().cloned().collect();

        prop_assert_eq!(once, twice);
        prop_assert_eq!(table.search_term(), "");
        prop_assert!(!table.has_active_filters());
    }

    #[test]
    fn prop_mutations_return_to_first_page(rows in rows_strategy(), page in 1usize..10, per_page in 1usize..10) {
        let mut table = TableState::new(rows, config(5));

        table.set_current_page(page);
        table.set_search_term("a");
        prop_assert_eq!(table.current_page(), 1);

        table.set_current_page(page);
        table.set_filter("status", "pending");
        prop_assert_eq!(table.current_page(), 1);

        table.set_current_page(page);
        table.clear_filters();
        prop_assert_eq!(table.current_page(), 1);

        table.set_current_page(page);
        table.set_items_per_page(per_page);
        prop_assert_eq!(table.current_page(), 1);
    }
}
