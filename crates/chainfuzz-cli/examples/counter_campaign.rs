//! A small campaign binary built on the harness.
//!
//! ```bash
//! cargo run -p chainfuzz-cli --example counter_campaign -- list
//! cargo run -p chainfuzz-cli --example counter_campaign -- run fuzz_counter -n 4 --coverage 2
//! ```
//!
//! Requires `anvil` on `PATH`.

use chainfuzz::prelude::*;
use std::process::ExitCode;

const COUNTER: &str = "contracts/Counter.sol";
const INCREMENT: IdePosition = IdePosition::new(12, 4, 14, 5);
const RESET: IdePosition = IdePosition::new(16, 4, 18, 5);

/// Drive a counter with random steps and check it against the chain height
#[fuzz_test]
pub fn fuzz_counter(ctx: &mut FuzzContext, coverage: Option<CoverageProbe>) -> TestResult {
    let mut coverage = coverage;
    let start = ctx.chain().block_number()?;
    let mut counter: u64 = 0;

    for step in 0..64u32 {
        if let Some(probe) = coverage.as_mut() {
            probe.begin_transaction();
        }
        ctx.watch("step", step);
        if ctx.rng().gen_bool(0.9) {
            counter += 1;
            if let Some(probe) = coverage.as_mut() {
                probe.record_hit(COUNTER, INCREMENT, "increment");
            }
        } else {
            counter = 0;
            if let Some(probe) = coverage.as_mut() {
                probe.record_hit(COUNTER, RESET, "reset");
            }
        }
        ctx.watch("counter", counter);
    }

    let height = ctx.chain().block_number()?;
    if height < start {
        return Err(format!("chain went backwards: {start} -> {height}").into());
    }
    Ok(())
}

fn main() -> ExitCode {
    chainfuzz_cli::harness::main(&[&FUZZ_COUNTER])
}
