// Interaction controllers for committee administration: debounced amount
// commits, optimistic paid toggles, the lottery reveal animation, and the
// spoken countdown timer. Each is a synchronous state machine driven by the
// orchestrator's event loop; time-based behavior runs in spawned tasks that
// report back through generation-tagged core events.

pub mod commit;
pub mod reveal;
pub mod timer;
pub mod toggle;

pub use commit::{CommitRequest, CommitResolution, CommitSink, DebouncedCommitController, FieldKey};
pub use reveal::{DrawRevealController, RevealError, RevealPhase};
pub use timer::{DrawTimer, SilentSpeaker, Speaker, SystemSpeaker, TimerPhase};
pub use toggle::{OptimisticToggleController, ToggleKey, ToggleRequest};
