// Git side of the daemon: process execution, operator prompt, commit cycle.

pub mod cycle;
pub mod prompt;
pub mod worker;
