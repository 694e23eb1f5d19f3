//! CLI command implementations

mod convert;
mod info;
mod seriesmeta;

pub use convert::convert;
pub use info::info;
pub use seriesmeta::seriesmeta;

use indicatif::{ProgressBar, ProgressStyle};

/// Bar for `total` steps; hidden when stderr is not a terminal
fn progress_bar(total: usize) -> ProgressBar {
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) =
        ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7}")
    {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}
