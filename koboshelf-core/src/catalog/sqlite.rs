//! KoboReader.sqlite backed catalog

use std::path::Path;

use rusqlite::{params, Connection, OpenFlags};

use super::Catalog;
use crate::error::CatalogError;

/// The `content` table of a Kobo's KoboReader.sqlite
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open an existing catalog for writing. The file is never created.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Catalog for SqliteCatalog {
    fn update_series(
        &self,
        image_id: &str,
        series: Option<&str>,
        series_number: Option<&str>,
    ) -> Result<usize, CatalogError> {
        let rows = self.conn.execute(
            "UPDATE content SET Series = ?1, SeriesNumber = ?2 WHERE ImageID = ?3",
            params![series, series_number, image_id],
        )?;
        Ok(rows)
    }
}
