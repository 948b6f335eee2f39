pub mod base_commands;
pub mod plot_cmd;
pub mod report_format;
pub mod simulate_cmd;
pub mod summary_cmd;
