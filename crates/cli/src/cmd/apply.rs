//! Implementation of the `stx apply` command.
//!
//! Loads a plan file and applies its operations as one transaction. If any
//! operation fails, everything applied before it is rolled back.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use statetx_lib::execute::Runner;
use statetx_lib::plan::PlanFile;

use crate::output::{operations, print_success};

pub fn cmd_apply(plan: &Path) -> Result<()> {
  let plan_file = PlanFile::load(plan).with_context(|| format!("Failed to load plan: {}", plan.display()))?;
  let ops = plan_file.into_operations().context("Invalid plan")?;

  info!(plan = %plan.display(), count = ops.len(), "applying plan");
  Runner::new()
    .apply(&ops)
    .context("Apply failed; earlier operations were rolled back")?;

  print_success(&format!("Applied {}", operations(ops.len())));
  Ok(())
}
