pub mod backend;
pub mod engine;
pub mod memory;
pub mod scan;

pub use backend::{Collection, Condition, Cursor, Database, Projection, Query, Update};
pub use engine::{Members, StorageEngine, ValuePredicate};
pub use memory::{CursorStats, MemoryCollection, MemoryDatabase};
pub use scan::Scan;
