//! Implementation of the `stx plan` command.
//!
//! Prints what `stx apply` would do with a plan file, touching nothing.

use std::path::Path;

use anyhow::{Context, Result};

use statetx_lib::plan::PlanFile;

use crate::output::{operations, print_info};

pub fn cmd_plan(plan: &Path) -> Result<()> {
  let plan_file = PlanFile::load(plan).with_context(|| format!("Failed to load plan: {}", plan.display()))?;
  let ops = plan_file.into_operations().context("Invalid plan")?;

  for (idx, op) in ops.iter().enumerate() {
    println!("  {:>3}. {}", idx + 1, op);
  }
  print_info(&format!("Would apply {}", operations(ops.len())));

  Ok(())
}
