//! Runtime Configuration

/// What happens to children when their parent is destroyed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DestroyPolicy {
    /// Destroy children depth-first before the parent
    #[default]
    Cascade,
    /// Orphan children: they stay alive, lose their parent and are
    /// lifted out of the parent's element before it is removed
    Detach,
}

/// Runtime configuration options
#[derive(Debug, Clone)]
pub struct Config {
    /// Policy used by `Runtime::destroy`
    pub destroy_policy: DestroyPolicy,

    /// Markup rendered when a pattern produces nothing but whitespace
    pub empty_html: String,

    /// Tag of the detached element a component owns before its first mount
    pub placeholder_tag: String,

    /// Upper bound on turns taken by `Runtime::run_until_idle`
    pub max_turns: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destroy_policy: DestroyPolicy::Cascade,
            empty_html: "<span>There are no rows available.</span>".to_string(),
            placeholder_tag: "div".to_string(),
            max_turns: 64,
        }
    }
}
