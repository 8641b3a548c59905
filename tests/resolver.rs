//! Source-query resolution against a scripted catalog

mod common;

use common::{ScriptedDriver, info, rows};
use export2csv::error::Error;
use export2csv::resolver::{
    CatalogDialect, MysqlCatalog, ObjectRef, ResolvedStatement, SysobjectsCatalog, resolve,
};
use pretty_assertions::assert_eq;

/// Catalog lookup `dialect` issues for `name`
fn lookup(dialect: &dyn CatalogDialect, name: &str) -> String {
    dialect.probe_sql(&ObjectRef::parse(name))
}

#[test]
fn test_table_reference_resolves_to_select() {
    let name = "mydb.dbo.Customers";
    let sql = lookup(&SysobjectsCatalog, name);
    let table = rows(&["type"], &[&[Some("U")]]);
    let mut driver = ScriptedDriver::new().on(&sql, vec![table]);

    let resolved = resolve(name, &mut driver, &SysobjectsCatalog).expect("resolve");

    let expected = ResolvedStatement {
        sql: "select * from mydb.dbo.Customers".to_string(),
        description: "Selecting from mydb.dbo.Customers".to_string(),
    };
    assert_eq!(resolved, expected);
    assert_eq!(driver.closed_cursors, 1);
}

#[test]
fn test_view_reference_resolves_to_select() {
    let name = "sales.monthly_totals";
    let sql = lookup(&MysqlCatalog, name);
    let view = rows(&["t"], &[&[Some("V")]]);
    let mut driver = ScriptedDriver::new().on(&sql, vec![view]);

    let resolved = resolve(name, &mut driver, &MysqlCatalog).expect("resolve");

    assert_eq!(resolved.sql, "select * from sales.monthly_totals");
}

#[test]
fn test_procedure_reference_resolves_to_call() {
    let name = "refresh_stats";
    let sql = lookup(&MysqlCatalog, name);
    let procedure = rows(&["t"], &[&[Some("P")]]);
    let mut driver = ScriptedDriver::new().on(&sql, vec![procedure, info(0)]);

    let resolved = resolve(name, &mut driver, &MysqlCatalog).expect("resolve");

    assert_eq!(resolved.sql, "call refresh_stats");
    assert_eq!(resolved.description, "Executing procedure refresh_stats");
}

#[test]
fn test_last_catalog_row_wins() {
    let sql = lookup(&SysobjectsCatalog, "dbo.t");
    let both = rows(&["type"], &[&[Some("U")], &[Some("P")]]);
    let mut driver = ScriptedDriver::new().on(&sql, vec![info(0), both]);

    let resolved = resolve("dbo.t", &mut driver, &SysobjectsCatalog).expect("resolve");

    assert_eq!(resolved.sql, "execute dbo.t");
}

#[test]
fn test_unclassified_object_is_not_found() {
    let name = "dbo.sysobjects";
    let sql = lookup(&SysobjectsCatalog, name);
    let system = rows(&["type"], &[&[Some("S ")]]);
    let mut driver = ScriptedDriver::new().on(&sql, vec![system]);

    let result = resolve(name, &mut driver, &SysobjectsCatalog);
    let err = result.expect_err("system table");

    assert!(matches!(err, Error::ObjectNotFound(_)));
}

#[test]
fn test_failing_catalog_query_is_a_driver_error() {
    let sql = lookup(&SysobjectsCatalog, "t");
    let message = "Table 'dbo.sysobjects' doesn't exist";
    let mut driver = ScriptedDriver::new().fail_on(&sql, "42S02", message);

    let result = resolve("t", &mut driver, &SysobjectsCatalog);
    let err = result.expect_err("catalog missing");

    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_literal_statement_skips_the_catalog() {
    let mut driver = ScriptedDriver::new();

    let resolved = resolve("select * from t", &mut driver, &MysqlCatalog).expect("resolve");

    assert_eq!(resolved.sql, "select * from t");
    assert_eq!(resolved.description, "Executing direct statement select * from t");
    assert!(driver.executed.is_empty());
}
