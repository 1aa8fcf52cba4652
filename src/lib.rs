//! Tails the log files of a directory and funnels every newly appended line,
//! parsed into a [`source::LogRecord`], into a single DuckDB-backed sink.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod tail;
