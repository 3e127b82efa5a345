pub mod constraint;
pub mod crop;
pub mod field;
pub mod plan;
pub mod recommendation;
pub mod risk;
pub mod sustainability;

pub use constraint::*;
pub use crop::*;
pub use field::*;
pub use plan::*;
pub use recommendation::*;
pub use risk::*;
pub use sustainability::*;
