use chrono::NaiveDate;
use mysql::{params, prelude::Queryable, Pool, PooledConn};
use tracing::{debug, info, warn};

use crate::{
    config::Config,
    error::{Error, Result},
    store::{SeriesStore, TableSink},
    timeseries::TimeSeries,
};

const MAX_IDENTIFIER_LEN: usize = 64;
/// `ER_NO_SUCH_TABLE`
const NO_SUCH_TABLE: u16 = 1146;

pub struct Database {
    pub pool: Pool,
    pub conn: PooledConn,
}

impl Database {
    pub fn from_config(config: &Config) -> Result<Self> {
        let pool = Pool::new(config.mysql_url.as_str())?;
        let conn = pool.get_conn()?;
        info!("Connected to MySQL");

        Ok(Database { pool, conn })
    }
}

impl TableSink for Database {
    fn replace_table(&mut self, name: &str, series: &TimeSeries) -> Result<()> {
        let table = quote_table(name)?;

        self.conn.query_drop(format!("DROP TABLE IF EXISTS {}", table))?;
        self.conn.query_drop(create_table_sql(&table))?;

        let stmt = self
            .conn
            .prep(format!("INSERT INTO {} (date, value) VALUES (:date, :value)", table))?;
        self.conn.exec_batch(
            &stmt,
            series.iter().map(|(date, value)| {
                params! {
                    "date" => date,
                    "value" => value,
                }
            }),
        )?;
        debug!("Replaced {} with {} rows", table, series.len());
        Ok(())
    }
}

impl SeriesStore for Database {
    /// A table that was never created loads as an empty series.
    fn load(&mut self, name: &str) -> Result<TimeSeries> {
        let table = quote_table(name)?;
        let rows: Vec<(NaiveDate, f64)> = match self
            .conn
            .query(format!("SELECT date, value FROM {} ORDER BY date", table))
        {
            Ok(rows) => rows,
            Err(e) if is_missing_table(&e) => {
                warn!("Table {} does not exist yet", table);
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(TimeSeries::from_pairs(name, rows))
    }
}

fn is_missing_table(error: &mysql::Error) -> bool {
    matches!(error, mysql::Error::MySqlError(e) if e.code == NO_SUCH_TABLE)
}

fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE {} (
            date DATE NOT NULL PRIMARY KEY,
            value DOUBLE NOT NULL)",
        table
    )
}

/// Backtick-quotes a series name for use as a table name. Only ASCII
/// letters, digits and underscores are accepted.
pub fn quote_table(name: &str) -> Result<String> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(format!("`{}`", name))
}
