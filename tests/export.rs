//! End-to-end exports against a scripted driver

mod common;

use std::fs;
use std::path::Path;

use common::{ScriptedDriver, failing_after, info, rows};
use export2csv::ExportConfig;
use export2csv::error::Error;
use export2csv::export::export;
use export2csv::resolver::{MysqlCatalog, SysobjectsCatalog};
use pretty_assertions::assert_eq;

const OBJECT: &str = "mydb.dbo.Customers";

const TYPE_QUERY: &str = concat!(
    "select o.type from mydb.dbo.sysobjects o join mydb.dbo.sysusers u ",
    "on o.uid = u.uid where o.name = 'Customers' and u.name = 'dbo'",
);

fn csv_config(output: &Path) -> ExportConfig {
    ExportConfig {
        field_delimiter: ",".to_string(),
        column_names: true,
        output_path: output.to_path_buf(),
        ..Default::default()
    }
}

fn read(path: impl AsRef<Path>) -> String {
    fs::read_to_string(path).expect("read output")
}

#[test]
fn test_header_and_quoted_delimiter() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("people.csv");
    let sql = "select name, age from people";
    let smith = [Some("Smith, J."), Some("42")];
    let obrien = [Some("O'Brien"), Some("7")];
    let people = rows(&["name", "age"], &[&smith, &obrien]);
    let mut driver = ScriptedDriver::new().on(sql, vec![people]);

    let config = csv_config(&output);
    let summary = export(&mut driver, sql, &config, &MysqlCatalog).expect("export");

    assert_eq!(read(&output), "name,age\n\"Smith, J.\",42\nO'Brien,7\n");
    assert_eq!(summary.rows, [2]);
    assert_eq!(driver.executed, [sql]);
    assert_eq!(driver.closed_cursors, 1);
}

#[test]
fn test_one_file_per_resultset() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("report.csv");
    let sql = "select 1 as a; select 2 as b; select 3 as c";
    let results = vec![
        rows(&["a"], &[&[Some("1")]]),
        rows(&["b"], &[&[Some("2")], &[Some("22")]]),
        rows(&["c"], &[]),
    ];
    let mut driver = ScriptedDriver::new().on(sql, results);

    let config = csv_config(&output);
    let summary = export(&mut driver, sql, &config, &MysqlCatalog).expect("export");

    assert_eq!(summary.resultsets(), 3);
    assert_eq!(summary.total_rows(), 3);
    assert_eq!(read(dir.path().join("report.csv")), "a\n1\n");
    assert_eq!(read(dir.path().join("report-02.csv")), "b\n2\n22\n");
    assert_eq!(read(dir.path().join("report-03.csv")), "c\n");
    assert!(!dir.path().join("report-04.csv").exists());
}

#[test]
fn test_informational_resultsets_produce_no_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.tsv");
    let sql = "update t set x = 1; select x from t";
    let results = vec![info(5), rows(&["x"], &[&[Some("1")], &[None]]), info(0)];
    let mut driver = ScriptedDriver::new().on(sql, results);
    let config = ExportConfig {
        output_path: output.clone(),
        ..Default::default()
    };

    let summary = export(&mut driver, sql, &config, &MysqlCatalog).expect("export");

    assert_eq!(summary.rows, [2]);
    assert_eq!(read(&output), "1\n\n");
    assert_eq!(fs::read_dir(dir.path()).expect("list").count(), 1);
}

#[test]
fn test_table_reference_is_selected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("customers.csv");
    let select = "select * from mydb.dbo.Customers";
    let table = rows(&["type"], &[&[Some("U ")]]);
    let customers = rows(&["id", "name"], &[&[Some("1"), Some("Acme   ")]]);
    let mut driver = ScriptedDriver::new()
        .on(TYPE_QUERY, vec![table])
        .on(select, vec![customers]);

    let config = csv_config(&output);
    export(&mut driver, OBJECT, &config, &SysobjectsCatalog).expect("export");

    assert_eq!(driver.executed, [TYPE_QUERY, select]);
    assert_eq!(read(&output), "id,name\n1,Acme\n");
}

#[test]
fn test_procedure_reference_is_executed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.csv");
    let call = "execute mydb.dbo.Customers";
    let procedure = vec![info(0), rows(&["type"], &[&[Some("P ")]])];
    let results = vec![info(1), rows(&["v"], &[&[Some(".5")]]), info(0)];
    let mut driver = ScriptedDriver::new()
        .on(TYPE_QUERY, procedure)
        .on(call, results);

    let config = csv_config(&output);
    export(&mut driver, OBJECT, &config, &SysobjectsCatalog).expect("export");

    assert_eq!(driver.executed[1], call);
    assert_eq!(read(&output), "v\n0.5\n");
}

#[test]
fn test_unknown_object_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.csv");
    let nothing = rows(&["type"], &[]);
    let mut driver = ScriptedDriver::new().on(TYPE_QUERY, vec![nothing]);

    let config = csv_config(&output);
    let result = export(&mut driver, OBJECT, &config, &SysobjectsCatalog);
    let err = result.expect_err("object should be missing");

    assert!(matches!(err, Error::ObjectNotFound(ref name) if name == OBJECT));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(driver.executed.len(), 1);
    assert!(!output.exists());
}

#[test]
fn test_script_file_is_run_verbatim() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("nightly.SQL");
    let sql = "select 1 as one;\nselect 2 as two;\n";
    fs::write(&script, sql).expect("write script");
    let output = dir.path().join("nightly.csv");
    let one = rows(&["one"], &[&[Some("1")]]);
    let two = rows(&["two"], &[&[Some("2")]]);
    let mut driver = ScriptedDriver::new().on(sql, vec![one, two]);

    let source = script.to_str().expect("utf-8 path");
    let config = csv_config(&output);
    export(&mut driver, source, &config, &MysqlCatalog).expect("export");

    assert_eq!(read(&output), "one\n1\n");
    assert_eq!(read(dir.path().join("nightly-02.csv")), "two\n2\n");
}

#[test]
fn test_missing_script_is_a_query_file_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("missing.sql");
    let mut driver = ScriptedDriver::new();

    let source = script.to_str().expect("utf-8 path");
    let config = csv_config(&dir.path().join("out.csv"));
    let result = export(&mut driver, source, &config, &MysqlCatalog);
    let err = result.expect_err("script is missing");

    assert!(matches!(err, Error::QueryFile { .. }));
    assert_eq!(err.exit_code(), 1);
    assert!(driver.executed.is_empty());
}

#[test]
fn test_failed_fetch_keeps_written_rows_and_continues() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("out.csv");
    let sql = "select a from t; select b from u";
    let three = rows(&["a"], &[&[Some("1")], &[Some("2")], &[Some("3")]]);
    let results = vec![failing_after(three, 2), rows(&["b"], &[&[Some("x")]])];
    let mut driver = ScriptedDriver::new().on(sql, results);

    let config = csv_config(&output);
    let summary = export(&mut driver, sql, &config, &MysqlCatalog).expect("export");

    assert_eq!(summary.rows, [2, 1]);
    assert_eq!(read(&output), "a\n1\n2\n");
    assert_eq!(read(dir.path().join("out-02.csv")), "b\nx\n");
}

#[test]
fn test_failed_execute_is_a_driver_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sql = "select * from nowhere where 1";
    let message = "Table 'test.nowhere' doesn't exist";
    let mut driver = ScriptedDriver::new().fail_on(sql, "42S02", message);

    let config = csv_config(&dir.path().join("o.csv"));
    let result = export(&mut driver, sql, &config, &MysqlCatalog);
    let err = result.expect_err("execute fails");

    assert!(matches!(err, Error::ServerError(_)));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(err.summary(), "Unrecoverable driver error");
}

#[test]
fn test_unwritable_output_is_an_output_file_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("no-such-dir").join("out.csv");
    let sql = "select 1 as a";
    let mut driver = ScriptedDriver::new().on(sql, vec![rows(&["a"], &[&[Some("1")]])]);

    let config = csv_config(&output);
    let result = export(&mut driver, sql, &config, &MysqlCatalog);
    let err = result.expect_err("output cannot be created");

    assert!(matches!(err, Error::OutputFile { .. }));
    assert_eq!(err.exit_code(), 1);
}

#[test]
fn test_flushes_large_resultsets() {
    let dir = tempfile::tempdir().expect("tempdir");
    let output = dir.path().join("big.csv");
    let values: Vec<String> = (0..2500).map(|i| i.to_string()).collect();
    let data: Vec<[Option<&str>; 1]> = values.iter().map(|v| [Some(v.as_str())]).collect();
    let data: Vec<&[Option<&str>]> = data.iter().map(|r| &r[..]).collect();
    let sql = "select n from numbers";
    let mut driver = ScriptedDriver::new().on(sql, vec![rows(&["n"], &data)]);
    let config = ExportConfig {
        output_path: output.clone(),
        ..Default::default()
    };

    let summary = export(&mut driver, sql, &config, &MysqlCatalog).expect("export");

    assert_eq!(summary.total_rows(), 2500);
    let written = read(&output);
    assert_eq!(written.lines().count(), 2500);
    assert!(written.ends_with("2499\n"));
}
