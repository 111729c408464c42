pub(crate) mod anticheat;
pub(crate) mod autosave;
pub(crate) mod errors;
pub(crate) mod grading;
pub(crate) mod overrides;
pub(crate) mod sessions;
pub(crate) mod shuffle;
pub(crate) mod snapshot;
pub(crate) mod timer;
