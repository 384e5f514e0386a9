//! Repository implementations for database operations
//!
//! Each repository is responsible for a specific domain entity and provides
//! CRUD operations and specialized queries. Cross-table writes that must be
//! atomic (e.g. ingestion completion replacing a material's flashcards) go
//! through the transaction utilities.

pub mod chat;
pub mod flashcards;
pub mod materials;
pub mod quizzes;
pub mod subscriptions;
//
// Transaction utilities
pub mod transaction;

pub use chat::ChatRepository;
pub use flashcards::FlashcardRepository;
pub use materials::MaterialRepository;
pub use quizzes::QuizRepository;
pub use subscriptions::SubscriptionRepository;
