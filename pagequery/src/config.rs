use serde::Deserialize;

/// Page size used when the request carries no `limit`
pub const DEFAULT_LIMIT: u64 = 20;
/// Largest `limit` a client may ask for
pub const MAX_LIMIT: u64 = 1000;

/// What to do with a `limit` outside `[1, max_limit]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPolicy {
    /// Fail with `InvalidPagination`
    #[default]
    Reject,
    /// Clamp into range and log a warning
    Clamp,
}

/// Rejected settings when loading a [`PageConfig`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_limit must be at least 1")]
    ZeroMaxLimit,

    #[error("default_limit {default_limit} must be between 1 and max_limit {max_limit}")]
    DefaultLimitOutOfRange { default_limit: u64, max_limit: u64 },
}

/// Pagination settings shared by the translator and the axum extractor.
///
/// Passed explicitly; nothing here is global. Deserializing checks
/// `1 <= default_limit <= max_limit`.
///
/// ```rust,ignore
/// let config: PageConfig = serde_json::from_str(r#"{"max_limit": 200, "limit_policy": "clamp"}"#)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawPageConfig")]
pub struct PageConfig {
    pub default_limit: u64,
    pub max_limit: u64,
    pub limit_policy: LimitPolicy,
    /// Refuse `limit=UNLIMITED` for entities whose schema is marked large
    pub refuse_unlimited_on_large: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
            limit_policy: LimitPolicy::Reject,
            refuse_unlimited_on_large: true,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct RawPageConfig {
    default_limit: u64,
    max_limit: u64,
    limit_policy: LimitPolicy,
    refuse_unlimited_on_large: bool,
}

impl Default for RawPageConfig {
    fn default() -> Self {
        let defaults = PageConfig::default();
        Self {
            default_limit: defaults.default_limit,
            max_limit: defaults.max_limit,
            limit_policy: defaults.limit_policy,
            refuse_unlimited_on_large: defaults.refuse_unlimited_on_large,
        }
    }
}

impl TryFrom<RawPageConfig> for PageConfig {
    type Error = ConfigError;

    fn try_from(raw: RawPageConfig) -> Result<Self, Self::Error> {
        let config = Self {
            default_limit: raw.default_limit,
            max_limit: raw.max_limit,
            limit_policy: raw.limit_policy,
            refuse_unlimited_on_large: raw.refuse_unlimited_on_large,
        };
        config.validate()?;
        Ok(config)
    }
}

impl PageConfig {
    /// Check the limits are usable.
    ///
    /// # Errors
    /// `ConfigError` when `max_limit` is zero or `default_limit` falls
    /// outside `[1, max_limit]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_limit == 0 {
            return Err(ConfigError::ZeroMaxLimit);
        }
        if !(1..=self.max_limit).contains(&self.default_limit) {
            return Err(ConfigError::DefaultLimitOutOfRange {
                default_limit: self.default_limit,
                max_limit: self.max_limit,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn with_max_limit(mut self, max_limit: u64) -> Self {
        self.max_limit = max_limit.max(1);
        self.default_limit = self.default_limit.min(self.max_limit);
        self
    }

    #[must_use]
    pub fn with_default_limit(mut self, default_limit: u64) -> Self {
        self.default_limit = default_limit.clamp(1, self.max_limit);
        self
    }

    #[must_use]
    pub fn with_limit_policy(mut self, policy: LimitPolicy) -> Self {
        self.limit_policy = policy;
        self
    }

    #[must_use]
    pub fn allow_unlimited_on_large(mut self) -> Self {
        self.refuse_unlimited_on_large = false;
        self
    }
}
