pub mod checkout;
pub mod flow;
pub mod pricing;
pub mod scheduling;
pub mod selector;

pub use checkout::*;
pub use flow::*;
pub use pricing::*;
pub use scheduling::*;
pub use selector::*;
