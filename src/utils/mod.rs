mod path;

pub use path::join_path;
