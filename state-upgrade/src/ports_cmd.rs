use access_core::ports::{parse_ports, port_ranges_equal};
use anyhow::{Context, Result};

use crate::cli::PortsEqualArgs;

pub fn run_ports_equal(args: PortsEqualArgs) -> Result<()> {
    let left = parse_ports(&args.left).context("invalid --left ports")?;
    let right = parse_ports(&args.right).context("invalid --right ports")?;

    println!("equal={}", port_ranges_equal(&left, &right));
    Ok(())
}
