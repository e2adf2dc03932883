use std::sync::Arc;

use crate::pipeline::Pipeline;
use crate::scheduler::ScheduleHandle;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub schedule: ScheduleHandle,
}
