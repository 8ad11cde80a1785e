mod stat_writer;

pub use stat_writer::{StatSender, StatWriter, StatWriterHandle, WriterMessage};
