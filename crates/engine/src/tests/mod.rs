mod helpers;

mod merge_tests;
mod write_tests;
