//! Data access layer: one narrow type per durable store, each wrapping a
//! shared [`crate::database::Database`].

pub mod cascade;
pub mod control_flag;
pub mod request_queue;
pub mod stack_store;
pub mod task_catalog;
pub mod task_queue;

pub use cascade::CascadeDal;
pub use control_flag::ControlFlagDal;
pub use request_queue::RequestQueueDal;
pub use stack_store::StackStoreDal;
pub use task_catalog::TaskCatalogDal;
pub use task_queue::TaskQueueDal;

use crate::database::Database;

/// Top-level handle bundling every store; cheap to clone (each field wraps
/// an `Arc`-backed connection pool internally).
#[derive(Clone)]
pub struct Dal {
    pub tasks: TaskCatalogDal,
    pub stacks: StackStoreDal,
    pub task_queue: TaskQueueDal,
    pub requests: RequestQueueDal,
    pub cascade: CascadeDal,
    pub control: ControlFlagDal,
}

impl Dal {
    pub fn new(db: Database) -> Self {
        let tasks = TaskCatalogDal::new(db.clone());
        Self {
            stacks: StackStoreDal::new(db.clone()),
            task_queue: TaskQueueDal::new(db.clone()),
            requests: RequestQueueDal::new(db.clone(), tasks.clone()),
            cascade: CascadeDal::new(db.clone()),
            control: ControlFlagDal::new(db),
            tasks,
        }
    }
}
