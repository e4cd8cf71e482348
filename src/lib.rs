pub mod severity;
pub mod fields;
pub mod record;
pub mod encoder;
pub mod sink;
pub mod writer_sink;
pub mod memory_sink;
pub mod output;

pub mod diagnostics;
pub mod logger;
pub mod pipeline;
pub mod layer;

pub mod chain;
pub mod reporter;
pub mod parse;

pub mod env;
pub mod config;
pub mod scenario;
