pub(crate) mod attempts;
pub(crate) mod papers;
pub(crate) mod questions;
pub(crate) mod sessions;
