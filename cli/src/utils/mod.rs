mod input;
mod logger;

pub use input::{print_json, prompt_password, read_json_arg};
pub use logger::init_logger;
