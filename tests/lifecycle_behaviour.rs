//! Behavioural scenarios for the volume lifecycle view.

mod lifecycle;
