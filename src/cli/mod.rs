//! CLI commands for wordcall.
//!
//! - **Round**: play
//! - **Progression**: progress, unlock, wardrobe
//! - **Catalog**: categories, history

pub mod play;

pub mod progress;
pub mod unlock;
pub mod wardrobe;

pub mod categories;
pub mod history;

pub use categories::CategoriesCommand;
pub use history::HistoryCommand;
pub use play::PlayCommand;
pub use progress::ProgressCommand;
pub use unlock::UnlockCommand;
pub use wardrobe::WardrobeCommand;
