pub mod order;
pub mod state_machine;

pub use order::{Order, OrderItem};
pub use state_machine::{transition_check, OrderStatus, TransitionOutcome};
