//! Print an example config file

use anyhow::Result;

pub fn run() -> Result<()> {
    print!("{}", quiesce_core::example_config());
    Ok(())
}
