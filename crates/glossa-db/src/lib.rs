//! Database repositories for the glossa learning engine
//!
//! Each repository owns one table and exposes the queries the services
//! need. State transitions that race with other writers (ingestion
//! status, review stages, quiz submission, weekly upload quota) are
//! expressed as conditional updates so the database arbitrates, never
//! an in-process lock.

pub mod db;
pub mod stores;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_support;

pub use db::{
    ChatRepository, FlashcardRepository, MaterialRepository, QuizRepository,
    SubscriptionRepository,
};
pub use stores::{
    ChatStore, FlashcardStore, MaterialStore, QuizStore, SubscriptionStore, UploadReservation,
};
