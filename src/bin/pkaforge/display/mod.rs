mod banner;
mod error;
mod progress;
mod tables;

pub use banner::{banner_for_help, print_banner};
pub use error::print_error;
pub use progress::Progress;
pub use tables::{print_input_summary, print_prediction, print_sites};

use std::io::{self, IsTerminal};

/// Whether banners, spinners and tables are drawn on stderr.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub interactive: bool,
}

impl Context {
    /// Decorates only a terminal stderr, and never under `--quiet`.
    pub fn new(quiet: bool) -> Self {
        Self {
            interactive: !quiet && io::stderr().is_terminal(),
        }
    }
}
