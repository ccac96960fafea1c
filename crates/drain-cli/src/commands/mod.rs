pub mod config;
pub mod generate;
pub mod probe;
pub mod run;
pub mod serve;
