pub mod read_coverage;
