use sweeper::SweeperError;
use sweeper::downloader::to_xlsx;
use sweeper::loader::{
    FileKind, UploadedFile, from_csv_bytes, from_excel_bytes, load_bytes, load_uploads,
    normalize_headers,
};
use sweeper::table::{ColumnType, Table, Value};

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

#[test]
fn test_file_kind_by_extension() {
    assert_eq!(FileKind::from_name("data.csv").unwrap(), FileKind::Csv);
    assert_eq!(FileKind::from_name("DATA.CSV").unwrap(), FileKind::Csv);
    assert_eq!(FileKind::from_name("book.xlsx").unwrap(), FileKind::Spreadsheet);
    assert!(matches!(
        FileKind::from_name("notes.txt"),
        Err(SweeperError::UnsupportedFile(_))
    ));
    assert!(FileKind::from_name("no_extension").is_err());
}

#[test]
fn test_csv_type_inference() {
    let csv = b"id,price,name,active,blank\n1,9.5,apple,true,\n2,,pear,False,\n3,4,NA,TRUE,\n";
    let table = from_csv_bytes(csv).unwrap();

    assert_eq!(table.shape(), (3, 5));
    assert_eq!(table.column_type("id").unwrap(), ColumnType::Integer);
    assert_eq!(table.column_type("price").unwrap(), ColumnType::Float);
    assert_eq!(table.column_type("name").unwrap(), ColumnType::Text);
    assert_eq!(table.column_type("active").unwrap(), ColumnType::Boolean);
    assert_eq!(table.column_type("blank").unwrap(), ColumnType::Empty);

    assert_eq!(table.rows()[2][1], Value::Float(4.0));
    assert_eq!(table.rows()[1][1], Value::Empty);
    assert_eq!(table.rows()[2][2], Value::Empty, "NA should read as missing");
    assert_eq!(table.rows()[1][3], Value::Bool(false));
}

#[test]
fn test_csv_mixed_column_keeps_raw_text() {
    let table = from_csv_bytes(b"code\n007\nabc\n").unwrap();
    assert_eq!(table.column_type("code").unwrap(), ColumnType::Text);
    assert_eq!(table.rows()[0][0], text("007"));
}

#[test]
fn test_csv_quoted_fields_and_bom() {
    let table = from_csv_bytes(b"\xEF\xBB\xBFname,note\n\"Smith, J\",\"said \"\"hi\"\"\"\n").unwrap();
    assert_eq!(table.columns(), &["name".to_string(), "note".to_string()]);
    assert_eq!(table.rows()[0][0], text("Smith, J"));
    assert_eq!(table.rows()[0][1], text("said \"hi\""));
}

#[test]
fn test_csv_short_rows_are_padded() {
    let table = from_csv_bytes(b"a,b,c\n1,2\n4,5,6\n").unwrap();
    assert_eq!(table.shape(), (2, 3));
    assert_eq!(table.rows()[0][2], Value::Empty);
    assert_eq!(table.rows()[1][2], Value::Int(6));
}

#[test]
fn test_csv_long_row_is_an_error() {
    let result = from_csv_bytes(b"a,b\n1,2,3\n");
    assert!(matches!(result, Err(SweeperError::InvalidTable(_))));
}

#[test]
fn test_csv_empty_file_is_an_error() {
    assert!(matches!(from_csv_bytes(b""), Err(SweeperError::EmptyFile(_))));
}

#[test]
fn test_header_normalization() {
    let headers = normalize_headers(vec![
        "a".to_string(),
        "".to_string(),
        "a".to_string(),
        "a".to_string(),
        "a.1".to_string(),
    ]);
    assert_eq!(headers, vec!["a", "Unnamed: 1", "a.1", "a.2", "a.1.1"]);

    let table = from_csv_bytes(b"x,x\n1,2\n").unwrap();
    assert_eq!(table.columns(), &["x".to_string(), "x.1".to_string()]);
}

#[test]
fn test_excel_load_from_generated_workbook() {
    let original = Table::new(
        vec!["city".to_string(), "visits".to_string(), "ratio".to_string(), "open".to_string()],
        vec![
            vec![text("Oslo"), Value::Int(10), Value::Float(0.5), Value::Bool(true)],
            vec![text("Lima"), Value::Empty, Value::Float(1.25), Value::Bool(false)],
            vec![text("Pune"), Value::Int(7), Value::Float(2.0), Value::Bool(true)],
        ],
    )
    .unwrap();

    let bytes = to_xlsx(&original).unwrap();
    let loaded = from_excel_bytes(&bytes).unwrap();

    assert_eq!(loaded.columns(), original.columns());
    assert_eq!(loaded.column_type("visits").unwrap(), ColumnType::Integer);
    assert_eq!(loaded.column_type("ratio").unwrap(), ColumnType::Float);
    assert_eq!(loaded.column_type("open").unwrap(), ColumnType::Boolean);
    assert_eq!(loaded.rows()[0][1], Value::Int(10));
    assert_eq!(loaded.rows()[1][1], Value::Empty);
    assert_eq!(loaded.rows()[1][2], Value::Float(1.25));
    assert_eq!(loaded.rows()[2][2], Value::Float(2.0));
}

#[test]
fn test_load_bytes_dispatches_on_extension() {
    let table = load_bytes("report.CSV", b"a\n1\n").unwrap();
    assert_eq!(table.shape(), (1, 1));

    let bad = load_bytes("report.xlsx", b"a\n1\n");
    assert!(matches!(bad, Err(SweeperError::Excel(_))), "CSV bytes are not a workbook");
}

#[test]
fn test_load_uploads_continues_after_failure() {
    let outcomes = load_uploads(vec![
        UploadedFile::new("good.csv", b"a,b\n1,2\n".to_vec()),
        UploadedFile::new("broken.xlsx", b"not a workbook".to_vec()),
        UploadedFile::new("notes.txt", b"hello".to_vec()),
        UploadedFile::new("also_good.csv", b"x\n1\n2\n".to_vec()),
    ]);

    assert_eq!(outcomes.len(), 4);
    assert!(outcomes[0].result.is_ok());
    assert!(outcomes[1].result.is_err());
    assert!(outcomes[2].result.is_err());
    assert_eq!(outcomes[3].result.as_ref().unwrap().shape(), (2, 1));
    assert_eq!(outcomes[1].name, "broken.xlsx");
    assert!((outcomes[0].size_kb - 8.0 / 1024.0).abs() < 1e-9);
}
