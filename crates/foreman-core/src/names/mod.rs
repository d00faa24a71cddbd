//! Generated laborer names for work registered without one.
use uuid::Uuid;

/// Source of candidate laborer names.
///
/// The boss asks for [`generate`](NameGenerator::generate) first and falls
/// back to [`regenerate`](NameGenerator::regenerate) while the candidate
/// collides with a registered laborer.
pub trait NameGenerator: Send + Sync {
    fn generate(&self) -> String;

    /// Candidate for retry number `attempt` (starting at 1).
    fn regenerate(&self, attempt: u32) -> String;
}

const ADJECTIVES: &[&str] = &[
    "brave", "calm", "clever", "eager", "fair", "gentle", "happy", "keen", "lively", "loyal",
    "merry", "nimble", "proud", "quick", "quiet", "steady", "swift", "tidy", "vivid", "witty",
];

const NOUNS: &[&str] = &[
    "badger", "beaver", "falcon", "ferret", "heron", "lynx", "marten", "otter", "owl", "panda",
    "puffin", "raven", "robin", "seal", "sparrow", "stoat", "swan", "tern", "wolf", "wren",
];

/// `adjective-noun` names, with a short hex suffix on retries.
#[derive(Debug, Default, Clone, Copy)]
pub struct HumanNames;

impl HumanNames {
    pub fn new() -> Self {
        Self
    }

    fn pick() -> (u128, String) {
        let bits = Uuid::new_v4().as_u128();
        let adjective = ADJECTIVES[(bits % ADJECTIVES.len() as u128) as usize];
        let noun = NOUNS[((bits >> 32) % NOUNS.len() as u128) as usize];
        (bits, format!("{adjective}-{noun}"))
    }
}

impl NameGenerator for HumanNames {
    fn generate(&self) -> String {
        Self::pick().1
    }

    fn regenerate(&self, attempt: u32) -> String {
        let (bits, base) = Self::pick();
        let suffix = (bits >> 64) as u32 ^ attempt;
        format!("{base}-{:04x}", suffix & 0xffff)
    }
}
