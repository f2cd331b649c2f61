// crates/distdelta-cli/src/io/mod.rs

pub mod atoms;
