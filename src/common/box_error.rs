//! boxed error type used for anything that crosses a thread boundary.
//!
//! The listener, the drain loop and the session relay all run on their own
//! threads, so errors that move between them have to be Send + Sync.
pub type BoxError = std::boxed::Box<
    dyn std::error::Error // must implement Error to satisfy ?
        + std::marker::Send // needed for threads
        + std::marker::Sync, // needed for threads
>;
