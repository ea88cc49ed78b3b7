//! statetx-lib: transactional execution of system-configuration changes
//!
//! A caller assembles an ordered list of operations and hands it to a
//! [`execute::Runner`], which applies them as a unit:
//! - `Operation`: one declarative change (write a file, make a directory,
//!   repoint a symlink, run a command)
//! - `Reversal`: the handle an applied operation returns, able to undo or
//!   finalize that change
//! - `Runner`: applies operations in order, unwinds on failure, cleans on success
//! - `PlanFile`: a JSON description of a transaction, loaded by the CLI

pub mod consts;
pub mod execute;
pub mod plan;
pub mod platform;
pub mod state;

#[cfg(test)]
mod util;
