pub mod event;
pub mod serialization;
pub mod state;
pub mod view;

pub use event::{EVENT_SCHEMA_VERSION, GameEvent, Winner};
pub use serialization::{GameSnapshot, PublicSummary, SeatSummary};
pub use state::{
    Action, GameError, GameOptions, GameState, IllegalAction, Outcome, Phase, Transition,
};
pub use view::SeatView;
