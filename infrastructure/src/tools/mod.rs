//! Builtin tools
//!
//! A small set of self-contained tools so the engine can be exercised end
//! to end without any external collaborator:
//!
//! | Tool | Category | Notes |
//! |------|----------|-------|
//! | `echo` | automation | returns its parameters; cacheable |
//! | `pick` | data | selects a field from the previous step's output |
//! | `summarize` | analysis | describes the previous step's output, reports confidence |
//! | `unstable_upstream` | integration | depends on `demo-upstream`; can be told to fail or stall |

mod builtin;

pub use builtin::{
    DEMO_GROUP, ECHO, Echo, PICK, Pick, SUMMARIZE, Summarize, UNSTABLE_UPSTREAM,
    UnstableUpstream, builtin_catalog, register_builtins,
};
