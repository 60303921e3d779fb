//! Node command handlers

use crate::error::CliResult;
use crate::output::Reporter;
use chainfuzz::{
    connect_with_retry, node_url, LocalNodeBackend, NetworkKind, NodeHandle, NodeLauncher,
    RetryPolicy, DEFAULT_BASE_PORT,
};

/// Execute `node check`: start, connect, read the block number, stop
pub fn execute_check(reporter: &Reporter, network: NetworkKind, port: u16) -> CliResult<u64> {
    reporter.info(&format!("starting {network} on port {port}"));
    let mut node = NodeLauncher::start(network, port)?;
    let url = node_url(port);
    let result = connect_with_retry(&LocalNodeBackend, &url, RetryPolicy::default(), &mut node)
        .and_then(|client| client.block_number());
    node.stop();

    let block = result?;
    reporter.success(&format!("{network} answered on port {port} at block {block}"));
    Ok(block)
}

/// Execute `node list`
pub fn execute_list_networks() {
    for kind in NetworkKind::ALL {
        let (program, args) = kind.command_line(DEFAULT_BASE_PORT);
        println!("{:<8} {program} {}", kind.as_str(), args.join(" "));
    }
}
