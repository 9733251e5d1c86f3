//! # quest-ledger
//!
//! Streak, XP/leveling and achievement engine for a gamified personal
//! budgeting application.
//!
//! The host application reports user activity (transactions, goals,
//! categories, logins) and the engine maintains daily streaks with
//! milestone bonuses, a lifetime XP ledger with a quadratic level curve,
//! and a catalog of achievements unlocked from activity counts.
//!
//! ## Architecture
//!
//! ```text
//! Host application events
//!     │
//!     ├── GamificationService (service/)
//!     │     ├── EngagementTracker (batched counters)
//!     │     └── NotificationBus (domain/) ──► relay task
//!     │
//!     ├── Streak / Level / Achievement rules (domain/)
//!     │
//!     └── GamificationStore + StatsProvider (persistence/)
//!           ├── MemoryStore
//!           └── PostgreSQL
//! ```

pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
