//! # doppelganger CLI
//!
//! Command-line interface for the duplicate image finder.
//!
//! ## Usage
//! ```bash
//! doppelganger scan ~/Pictures --sensitivity 8
//! doppelganger scan ~/Pictures --verbose --output json
//! ```
//!
//! Set `RUST_LOG=doppelganger=debug` for diagnostic logging.

mod cli;

use doppelganger::Result;

fn main() -> Result<()> {
    doppelganger::init_tracing();
    cli::run()
}
