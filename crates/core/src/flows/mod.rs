pub mod engine;
pub mod states;

pub use engine::{DialogFlow, RouteEngine, RouteTracker, RoutingError, TravelFlow};
pub use states::{DialogNode, RouteAction, RouteContext, RouteEvent, TransitionOutcome};
