//! Command handlers - kept out of main.rs for testability

pub mod campaign;
pub mod coverage;
pub mod node;

pub use campaign::{build_campaign_config, execute_list, execute_run, render_test_list};
pub use coverage::{execute_merge, execute_summary, merge_files, render_summary};
pub use node::{execute_check, execute_list_networks};
