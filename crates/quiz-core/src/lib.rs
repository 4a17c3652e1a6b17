pub mod game;
pub mod judge;
pub mod protocol;
pub mod rounds;

pub use game::{GameState, RoundResult};
pub use judge::{Generator, Judge, ServiceError, Verdict};
pub use protocol::{ClientMessage, LeaderboardEntry, ProgressPatch, ServerMessage};
pub use rounds::{ContentKind, Round};
