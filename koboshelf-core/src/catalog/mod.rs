//! Device catalog access

mod sqlite;

pub use sqlite::SqliteCatalog;

use crate::error::CatalogError;

/// Store of per-book records keyed by ImageID
pub trait Catalog {
    /// Set the series columns of every record whose ImageID matches.
    ///
    /// `None` stores NULL. Returns the number of rows affected.
    fn update_series(
        &self,
        image_id: &str,
        series: Option<&str>,
        series_number: Option<&str>,
    ) -> Result<usize, CatalogError>;
}
