pub mod session;
pub mod signal;
pub mod types;
pub mod verdict;

pub use session::{PageFilter, PageKind, TaskSession};
pub use signal::{GenericPage, PageSignal, ShortCard, SignalSource, VideoCard};
pub use types::{KeywordSet, LastError, QueueSnapshot, TaskStamp, WebContent};
pub use verdict::{
    Directive, LocalDecision, LocalRule, MatchLocation, MatchedTerm, RelevanceVerdict,
    VerdictSource,
};
