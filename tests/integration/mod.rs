mod config_tests;
mod pipeline_tests;
mod report_tests;
mod retention_tests;
mod scan_tests;
