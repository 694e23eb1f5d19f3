//! Info command implementation

use anyhow::{Context, Result};
use koboshelf_core::kobo::{content_id, image_id};
use koboshelf_core::read_metadata;
use serde::Serialize;
use std::path::Path;

/// Book info output
#[derive(Serialize)]
struct BookInfo {
    series: Option<String>,
    series_index: Option<f64>,
    series_number: Option<String>,
    content_id: String,
    image_id: String,
}

/// Display the series metadata of an EPUB
pub fn info(input: &Path, json: bool) -> Result<()> {
    let metadata = read_metadata(input)
        .with_context(|| format!("Failed to read metadata from {}", input.display()))?;

    // Identifiers as they would be if the file sat at the device root
    let name = input
        .file_name()
        .context("Could not determine the input file name")?;
    let cid = content_id(Path::new(name));

    let info = BookInfo {
        series: metadata.series_name.clone(),
        series_index: metadata.series_index,
        series_number: metadata.series_number(),
        image_id: image_id(&cid),
        content_id: cid,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        match metadata.series_name() {
            Some(series) => println!("Series:       {}", series),
            None => println!("Series:       (none)"),
        }
        match &info.series_number {
            Some(number) => println!("Series index: {}", number),
            None => println!("Series index: (none)"),
        }
        println!("Content ID:   {}", info.content_id);
        println!("Image ID:     {}", info.image_id);
    }

    Ok(())
}
