pub mod prompt;
pub mod server;
pub mod utils;

pub use server::NotepadServer;
