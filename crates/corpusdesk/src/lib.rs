pub mod handlers;
pub mod loader;

pub use handlers::{AppState, Engine, router};
pub use loader::{LoadMode, load_corpus_dir, read_snapshot, write_snapshot};
