pub mod discover;
pub mod format;
pub mod parser;
pub mod reader;
pub mod record;
pub mod timestamp;

pub use discover::{discover_files, WatchedFile};
pub use format::detect_format;
pub use parser::parse_line;
pub use reader::{read_new_lines, ReaderError, SkipCounter};
pub use record::{LogFormat, LogRecord};
