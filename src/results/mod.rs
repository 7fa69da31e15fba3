pub mod signal;
pub mod store;
pub mod view;

pub use signal::{
    Unsubscribe,
    UpdateSignal,
};
pub use store::ResultStore;
pub use view::ResultsSection;
