mod controller;
mod state;
mod types;


pub use controller::WorkflowController;
pub use state::WorkflowState;
pub use types::{Effect, Mode, WorkflowEvent};
