pub mod githook;
pub mod knative;
pub mod tekton;

pub use githook::*;
pub use knative::*;
pub use tekton::*;
