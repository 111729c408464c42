pub(crate) mod assignments;
pub(crate) mod checkpoints;
pub(crate) mod events;
pub(crate) mod notifications;
pub(crate) mod submissions;
