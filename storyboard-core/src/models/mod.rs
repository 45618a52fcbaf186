mod agent_run;
mod criterion;
mod event;
mod member;
mod presence;
mod project;
mod story;
mod view;

pub use agent_run::*;
pub use criterion::*;
pub use event::*;
pub use member::*;
pub use presence::*;
pub use project::*;
pub use story::*;
pub use view::*;
