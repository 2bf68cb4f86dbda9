pub mod generate;
pub mod jobs;
