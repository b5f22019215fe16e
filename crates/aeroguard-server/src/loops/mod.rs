//! Background loops for continuous processing.

pub mod staleness_loop;
