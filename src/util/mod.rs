/// Helper functions for read/writing JSON via serde
pub mod json_io;
/// Log-space arithmetic shared by the calculators
pub mod math;
/// Helper functions for generating the progress bars
pub mod progress_bar;
