//! Application-wide constants and default values
//!
//! Centralized location for all hard-coded tunables so the heuristics live
//! in one place instead of being forked across code paths.

/// Layout planner constants
pub mod layout {
    /// Horizontal spacing between grid columns
    pub const SPACING_X: i32 = 220;

    /// Vertical spacing between grid rows
    pub const SPACING_Y: i32 = 160;

    /// Number of columns in the auto-placement grid
    pub const GRID_COLUMNS: usize = 6;

    /// Maximum number of occupied-cell probes before accepting a collision
    pub const PLACEMENT_RETRY: usize = 50;
}

/// Auto-wire scoring constants
pub mod wire {
    /// Minimum score a candidate must reach to be connected in scored mode
    pub const SCORE_THRESHOLD: i32 = 20;

    /// Bonus when the candidate is the exact same type as the new node
    pub const SAME_TYPE_BONUS: i32 = 50;

    /// Bonus when the candidate shares the new node's family
    pub const FAMILY_BONUS: i32 = 30;

    /// Bonus when the candidate's output feeds nothing yet
    pub const FREE_OUTPUT_BONUS: i32 = 10;

    /// Per-position recency bonus (most recently created sibling scores highest)
    pub const RECENCY_STEP: i32 = 2;

    /// Score step between adjacent ranks in the per-type priority tables
    pub const PRIORITY_RANK_STEP: i32 = 5;
}

/// Dispatch layer constants
pub mod dispatch {
    /// Wait budget for read-class commands (seconds)
    pub const READ_TIMEOUT_SECS: u64 = 10;

    /// Wait budget for mutation-class commands (seconds)
    pub const MUTATE_TIMEOUT_SECS: u64 = 15;

    /// Wait budget reserved for long-running command classes (seconds).
    /// No built-in command uses it; transports that add a heavy class should.
    pub const HEAVY_TIMEOUT_SECS: u64 = 30;

    /// Extra wait granted when the worker reclaimed the entry right at the
    /// caller's deadline and the result write is imminent (milliseconds)
    pub const RECLAIM_GRACE_MS: u64 = 250;
}

/// Graph bookkeeping constants
pub mod graph {
    /// Maximum retained connection audit records (oldest evicted first)
    pub const CONNECTION_LOG_CAP: usize = 100;
}

/// Transport boundary constants
pub mod server {
    /// Default TCP port for the line-delimited JSON transport
    pub const DEFAULT_PORT: u16 = 8053;

    /// Environment variable overriding the port
    pub const PORT_ENV: &str = "PATCHBAY_PORT";

    /// Environment variable listing extra protected paths (comma separated)
    pub const PROTECTED_ENV: &str = "PATCHBAY_PROTECTED_PATHS";
}
