pub mod collaborator;
pub mod feedback;

pub use collaborator::*;
pub use feedback::*;
