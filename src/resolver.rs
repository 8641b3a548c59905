//! Turns the source-query argument into the statement to run.
//!
//! The argument is, checked in this order:
//! - a script when it ends in `.sql` (any case), whose contents are run
//! - a bare `[database.][owner.]object` reference when it has no whitespace,
//!   classified through a catalog probe
//! - a literal SQL statement otherwise

use std::fmt;
use std::path::Path;

use tracing::{debug, error};

use crate::config::CatalogKind;
use crate::driver::{Driver, Fetch, RowBuffer, Severity, report_diagnostics};
use crate::error::{Error, Result};

/// The source-query argument, classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceQuery<'a> {
    ScriptFile(&'a str),
    Object(ObjectRef<'a>),
    Literal(&'a str),
}

impl<'a> SourceQuery<'a> {
    pub fn classify(source: &'a str) -> Self {
        let is_script = source
            .len()
            .checked_sub(4)
            .and_then(|start| source.get(start..))
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(".sql"));

        if is_script {
            SourceQuery::ScriptFile(source)
        } else if source.chars().any(char::is_whitespace) {
            SourceQuery::Literal(source)
        } else {
            SourceQuery::Object(ObjectRef::parse(source))
        }
    }
}

/// A `[database.][owner.]object` reference. Parts are taken from the right;
/// missing leading parts are empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef<'a> {
    pub database: &'a str,
    pub owner: &'a str,
    pub object: &'a str,
    /// The reference as written
    pub reference: &'a str,
}

impl<'a> ObjectRef<'a> {
    pub fn parse(reference: &'a str) -> Self {
        let mut parts = reference.rsplitn(3, '.');
        let object = parts.next().unwrap_or_default();
        let owner = parts.next().unwrap_or_default();
        let database = parts.next().unwrap_or_default();
        Self {
            database,
            owner,
            object,
            reference,
        }
    }
}

impl fmt::Display for ObjectRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reference)
    }
}

/// What a catalog probe found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Procedure,
    /// Table or view
    Relation,
}

impl ObjectKind {
    /// `P` is a procedure, `U` and `V` a table or view. Only the first
    /// character counts.
    pub fn from_type_code(code: char) -> Option<Self> {
        match code {
            'P' => Some(ObjectKind::Procedure),
            'U' | 'V' => Some(ObjectKind::Relation),
            _ => None,
        }
    }
}

/// How a database catalog is asked about an object, and how the object is
/// then run
pub trait CatalogDialect {
    /// Query returning the one-letter type code of `object`, at most one row
    fn probe_sql(&self, object: &ObjectRef<'_>) -> String;

    /// Statement running procedure `object`
    fn procedure_sql(&self, object: &ObjectRef<'_>) -> String;

    /// Statement selecting every row of table or view `object`
    fn select_sql(&self, object: &ObjectRef<'_>) -> String;
}

impl CatalogKind {
    pub fn dialect(self) -> Box<dyn CatalogDialect> {
        match self {
            CatalogKind::Mysql => Box::new(MysqlCatalog),
            CatalogKind::Sysobjects => Box::new(SysobjectsCatalog),
        }
    }
}

/// Double single quotes for use inside a string literal
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `information_schema` lookup. MySQL has no owner level, so the schema is
/// the database part when given, else the owner part, else the current
/// database.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlCatalog;

impl MysqlCatalog {
    fn schema<'a>(object: &ObjectRef<'a>) -> Option<&'a str> {
        [object.database, object.owner]
            .into_iter()
            .find(|part| !part.is_empty())
    }

    fn qualified(object: &ObjectRef<'_>) -> String {
        match Self::schema(object) {
            Some(schema) => format!("{schema}.{}", object.object),
            None => object.object.to_string(),
        }
    }
}

impl CatalogDialect for MysqlCatalog {
    fn probe_sql(&self, object: &ObjectRef<'_>) -> String {
        let schema = match Self::schema(object) {
            Some(schema) => quote_literal(schema),
            None => "database()".to_string(),
        };
        let name = quote_literal(object.object);
        format!(
            "select case table_type when 'VIEW' then 'V' else 'U' end \
             from information_schema.tables \
             where table_schema = {schema} and table_name = {name} \
             union all \
             select 'P' from information_schema.routines \
             where routine_schema = {schema} and routine_name = {name} \
             and routine_type = 'PROCEDURE'"
        )
    }

    fn procedure_sql(&self, object: &ObjectRef<'_>) -> String {
        format!("call {}", Self::qualified(object))
    }

    fn select_sql(&self, object: &ObjectRef<'_>) -> String {
        format!("select * from {}", Self::qualified(object))
    }
}

/// `sysobjects` joined with `sysusers`, three-part `database.owner.object`
/// names
#[derive(Debug, Clone, Copy, Default)]
pub struct SysobjectsCatalog;

impl SysobjectsCatalog {
    fn qualified(object: &ObjectRef<'_>) -> String {
        match (object.database, object.owner) {
            ("", "") => object.object.to_string(),
            ("", owner) => format!("{owner}.{}", object.object),
            (database, owner) => format!("{database}.{owner}.{}", object.object),
        }
    }
}

impl CatalogDialect for SysobjectsCatalog {
    fn probe_sql(&self, object: &ObjectRef<'_>) -> String {
        let catalog = if object.database.is_empty() {
            "dbo".to_string()
        } else {
            format!("{}.dbo", object.database)
        };
        let mut sql = format!(
            "select o.type from {catalog}.sysobjects o \
             join {catalog}.sysusers u on o.uid = u.uid \
             where o.name = {}",
            quote_literal(object.object)
        );
        if !object.owner.is_empty() {
            sql.push_str(" and u.name = ");
            sql.push_str(&quote_literal(object.owner));
        }
        sql
    }

    fn procedure_sql(&self, object: &ObjectRef<'_>) -> String {
        format!("execute {}", Self::qualified(object))
    }

    fn select_sql(&self, object: &ObjectRef<'_>) -> String {
        format!("select * from {}", Self::qualified(object))
    }
}

/// The statement to run and how to announce it in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStatement {
    pub sql: String,
    pub description: String,
}

/// Resolve `source` into a statement, probing the catalog through `driver`
/// for a bare object reference
pub fn resolve<D: Driver + ?Sized>(
    source: &str,
    driver: &mut D,
    dialect: &dyn CatalogDialect,
) -> Result<ResolvedStatement> {
    match SourceQuery::classify(source) {
        SourceQuery::ScriptFile(file) => {
            debug!("Query ends with .sql, assume it is a file.");
            let sql = std::fs::read_to_string(file).map_err(|source| Error::QueryFile {
                path: Path::new(file).to_path_buf(),
                source,
            })?;
            Ok(ResolvedStatement {
                sql,
                description: format!("Executing script from {file}"),
            })
        }
        SourceQuery::Literal(sql) => Ok(ResolvedStatement {
            sql: sql.to_string(),
            description: format!("Executing direct statement {sql}"),
        }),
        SourceQuery::Object(object) => {
            debug!("One-word query, is this an object?");
            let probe_sql = dialect.probe_sql(&object);
            debug!("{probe_sql}");
            let type_code = probe(driver, &probe_sql)?;
            match type_code.and_then(ObjectKind::from_type_code) {
                Some(ObjectKind::Procedure) => Ok(ResolvedStatement {
                    sql: dialect.procedure_sql(&object),
                    description: format!("Executing procedure {object}"),
                }),
                Some(ObjectKind::Relation) => Ok(ResolvedStatement {
                    sql: dialect.select_sql(&object),
                    description: format!("Selecting from {object}"),
                }),
                None => {
                    error!("Object {object} was not found, aborting");
                    Err(Error::ObjectNotFound(object.to_string()))
                }
            }
        }
    }
}

/// Run a catalog probe and return the first character of the first column
/// of the last row it produced
fn probe<D: Driver + ?Sized>(driver: &mut D, sql: &str) -> Result<Option<char>> {
    let result = read_type_code(driver, sql).and_then(|code| {
        driver.close_cursor()?;
        Ok(code)
    });
    if result.is_err() {
        report_diagnostics(driver, Severity::Critical);
    }
    result
}

fn read_type_code<D: Driver + ?Sized>(driver: &mut D, sql: &str) -> Result<Option<char>> {
    driver.execute(sql)?;

    let mut code = None;
    loop {
        let column_count = driver.column_count()?;
        if column_count > 0 {
            let columns = (0..column_count)
                .map(|i| driver.describe_column(i))
                .collect::<Result<Vec<_>>>()?;
            let mut row = RowBuffer::for_columns(&columns);
            while driver.fetch_row(&mut row)? == Fetch::Row {
                code = row
                    .get(0)
                    .and_then(|field| field.value())
                    .and_then(|value| value.first())
                    .map(|&b| char::from(b));
            }
        }
        if !driver.more_results()? {
            return Ok(code);
        }
    }
}
