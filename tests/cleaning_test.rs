use sweeper::cleaning::{CleaningOptions, apply_cleaning, drop_duplicates, fill_missing_with_mean};
use sweeper::loader::from_csv_bytes;
use sweeper::table::{ColumnType, Table, Value};

fn sample() -> Table {
    from_csv_bytes(
        b"name,age,score,team\n\
          ann,30,1.5,red\n\
          bob,,2.5,\n\
          ann,30,1.5,red\n\
          cid,40,,blue\n\
          bob,,2.5,\n",
    )
    .unwrap()
}

#[test]
fn test_drop_duplicates_keeps_first_occurrence() {
    let mut table = sample();
    let removed = drop_duplicates(&mut table);

    assert_eq!(removed, 2);
    assert_eq!(table.shape(), (3, 4));
    let names: Vec<String> = table.rows().iter().map(|r| r[0].to_string()).collect();
    assert_eq!(names, vec!["ann", "bob", "cid"]);
}

#[test]
fn test_drop_duplicates_is_idempotent() {
    let mut once = sample();
    drop_duplicates(&mut once);

    let mut twice = once.clone();
    let removed_again = drop_duplicates(&mut twice);

    assert_eq!(removed_again, 0);
    assert_eq!(once, twice);
}

#[test]
fn test_drop_duplicates_treats_whole_floats_as_equal_ints() {
    let mut table = Table::new(
        vec!["n".to_string()],
        vec![vec![Value::Int(2)], vec![Value::Float(2.0)], vec![Value::Float(-0.0)], vec![Value::Int(0)]],
    )
    .unwrap();
    assert_eq!(drop_duplicates(&mut table), 2);
}

#[test]
fn test_fill_missing_uses_column_mean() {
    let mut table = sample();
    let filled = fill_missing_with_mean(&mut table);

    // age: mean of 30, 30, 40; score: mean of 1.5, 2.5, 1.5, 2.5
    assert_eq!(filled, 3);
    let age = table.column_values("age").unwrap();
    assert_eq!(*age[1], Value::Float(100.0 / 3.0));
    assert_eq!(*age[4], Value::Float(100.0 / 3.0));
    let score = table.column_values("score").unwrap();
    assert_eq!(*score[3], Value::Float(2.0));
}

#[test]
fn test_fill_missing_never_changes_present_values() {
    let before = sample();
    let mut after = before.clone();
    fill_missing_with_mean(&mut after);

    for (old_row, new_row) in before.rows().iter().zip(after.rows()) {
        for (old, new) in old_row.iter().zip(new_row) {
            if !old.is_missing() {
                assert_eq!(old, new, "non-missing cell changed");
            }
        }
    }
}

#[test]
fn test_fill_missing_skips_non_numeric_columns() {
    let mut table = sample();
    fill_missing_with_mean(&mut table);

    let team = table.column_values("team").unwrap();
    assert_eq!(*team[1], Value::Empty, "text column must stay unfilled");
    assert_eq!(table.column_type("team").unwrap(), ColumnType::Text);
    assert_eq!(table.column_type("age").unwrap(), ColumnType::Float);
}

#[test]
fn test_fill_missing_leaves_all_empty_column() {
    let mut table = from_csv_bytes(b"a,b\n1,\n2,\n").unwrap();
    assert_eq!(fill_missing_with_mean(&mut table), 0);
    assert_eq!(table.rows()[0][1], Value::Empty);
}

#[test]
fn test_apply_cleaning_runs_selected_steps() {
    let mut table = sample();
    let report = apply_cleaning(&mut table, CleaningOptions::default());
    assert_eq!(report.duplicates_removed, 0);
    assert_eq!(report.cells_filled, 0);
    assert_eq!(table, sample());

    let report = apply_cleaning(
        &mut table,
        CleaningOptions {
            remove_duplicates: true,
            fill_missing: true,
        },
    );
    assert_eq!(report.duplicates_removed, 2);
    // After dedupe: age missing once (bob), score missing once (cid)
    assert_eq!(report.cells_filled, 2);
    assert_eq!(table.column_values("age").unwrap()[1], &Value::Float(35.0));
    assert_eq!(table.column_values("score").unwrap()[2], &Value::Float(2.0));
}
