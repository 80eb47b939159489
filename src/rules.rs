mod read_only_by_ref;

pub use read_only_by_ref::{READ_ONLY_BY_REF, ReadOnlyByRefLint};
