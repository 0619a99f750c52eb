//! Typed schemas for the application's collections.
//!
//! | Collection | Schema |
//! |------------|--------|
//! | `skills` | `Skill` |
//! | `interestToGrow` | `InterestToGrow` |
//! | `perfiles` | `Profile` (keyed by owner id) |
//! | `mensajes` | `Message` |
//! | `conversaciones` | `Conversation` |

pub mod catalog;
pub mod profile;
pub mod chat;

pub use catalog::{Skill, InterestToGrow};
pub use profile::{Profile, ProfessionalExperience, Study};
pub use chat::{Message, MessageKind, Conversation};

/// Collection names as they exist on the backend.
pub mod collections {
    pub const SKILLS: &str = "skills";
    pub const INTERESTS: &str = "interestToGrow";
    pub const PROFILES: &str = "perfiles";
    pub const MESSAGES: &str = "mensajes";
    pub const CONVERSATIONS: &str = "conversaciones";
}
