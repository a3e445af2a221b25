//! Gmail Rules Engine
//!
//! Synchronizes a Gmail mailbox into a local store and evaluates a
//! declarative JSON ruleset against every stored message, applying label
//! mutations (mark read/unread, move) to messages that match.
//!
//! # Overview
//!
//! - **Rules**: ruleset model and a loader with path-qualified validation errors
//! - **Predicates**: case-insensitive string tests and relative-date windows
//! - **Engine**: AND within a rule, ALL/ANY across rules, action dispatch
//! - **Actions**: one `messages.modify` request per action, with timeouts
//! - **Sync**: concurrent fetch of listed messages into the store
//!
//! # Example Usage
//!
//! ```no_run
//! use gmail_rules::{ActionApplier, FixedClock, MemoryStore, RuleEngine, Ruleset};
//! use gmail_rules::client::MailSink;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(sink: Arc<dyn MailSink>) -> gmail_rules::Result<()> {
//! let ruleset = Arc::new(Ruleset::load("rules.json".as_ref()).await?);
//! let store = MemoryStore::new();
//!
//! let applier = ActionApplier::new(sink, Duration::from_secs(30));
//! let engine = RuleEngine::new(applier, Arc::new(FixedClock(chrono::Utc::now())));
//!
//! let report = engine.process_store(&store, ruleset, 8).await?;
//! println!("{}", report.to_markdown());
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail API initialization
//! - [`client`] - Mail source/sink traits and the Gmail-backed client
//! - [`cli`] - Command-line arguments and the sync-then-process pipeline
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`label_manager`] - Destination label resolution
//! - [`models`] - Core data structures
//! - [`rules`] - Ruleset model and loader
//! - [`predicate`] - Predicate evaluation
//! - [`engine`] - Rule evaluation and processing
//! - [`actions`] - Action application
//! - [`store`] - Local message store
//! - [`sync`] - Mailbox synchronization
//! - [`report`] - Per-message outcomes and run reports

pub mod actions;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod label_manager;
pub mod models;
pub mod predicate;
pub mod report;
pub mod rules;
pub mod store;
pub mod sync;

// Re-export commonly used types for convenience
pub use error::{GmailError, Result};

// Core data models
pub use models::{LabelInfo, LabelModification, MessageRecord};

// Rule model
pub use rules::{
    ActionKind, Combinator, Condition, ConditionValue, DatePredicate, Field, Predicate,
    RelativeDate, Rule, RuleAction, Ruleset, StringPredicate, TimeUnit,
};

// Evaluation
pub use actions::ActionApplier;
pub use engine::{ActionPolicy, Clock, FixedClock, RuleEngine, SystemClock};
pub use report::{ActionFailure, MessageOutcome, RunReport};

// Config types
pub use config::{Config, ExecutionConfig, LabelConfig, RulesConfig, StoreConfig, SyncConfig};

// Client traits
pub use client::{MailSink, MailSource, ProductionGmailClient};

// Storage and sync
#[cfg(feature = "cache")]
pub use store::SqliteStore;
pub use store::{MemoryStore, MessageStore};
pub use sync::{SyncReport, Synchronizer};
