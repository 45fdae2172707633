mod bar_graph;
mod device_selector;
mod error;

pub use bar_graph::bar_graph;
pub use device_selector::device_selector;
pub use error::SonarGuiError;
