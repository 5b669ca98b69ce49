mod assignment;
mod clock;
mod scheduler;

pub use clock::now;
pub use assignment::{
    Assignment, AssignmentDTO, AssignmentLog, SearchAssignmentQuery, SearchAssignmentQueryResult,
};
pub use scheduler::{
    Scheduler, SchedulerAssignee, SchedulerDTO, SearchSchedulerQuery, SearchSchedulerQueryResult,
};
