pub mod commands;
pub mod controller;
pub mod deep_link;
pub mod history;
pub mod momentum;
pub mod shortcuts;

pub use commands::{apply_command, NavCommand, NavEffect};
pub use controller::{NavConfig, NavigationController, Transition};
pub use deep_link::{build_link, DeepLink, LinkTarget};
pub use history::{HistoryMode, HistorySync, MemoryHistory};
pub use momentum::{Momentum, MomentumConfig};
pub use shortcuts::{command_for_key, KeyInput};
